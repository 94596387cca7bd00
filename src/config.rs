//! Runtime configuration loaded from a YAML file.
//!
//! Policy constants live here rather than in code: the similarity threshold
//! and the recent-window size were inferred from observed behavior of the
//! destination store, so they are tunable configuration, not load-bearing
//! constants. Every field has a documented default; a missing config file
//! yields the defaults.
//!
//! Secrets (analyzer API key, store token) are normally supplied through
//! CLI/env arguments and merged over the file values in `main`.

use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Top-level configuration for one engine run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cascade: CascadeConfig,
    #[serde(default)]
    pub dedupe: DedupeConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Shared HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. Bounds every network call so one
    /// unreachable endpoint cannot stall the whole run.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// User-Agent header; some feed hosts reject the default reqwest UA.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Fallback cascade bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CascadeConfig {
    /// Whole-pipeline passes, shared across both content types.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
    /// Feed entries inspected per alternative source.
    #[serde(default = "default_entries_per_alternative")]
    pub entries_per_alternative: usize,
    /// Pause between passes, in seconds, to avoid hammering feed hosts.
    #[serde(default = "default_pass_pause_secs")]
    pub pass_pause_secs: u64,
}

/// Near-duplicate detection policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DedupeConfig {
    /// Token-set Jaccard similarity at or above which two titles are the
    /// same material. The high bar tolerates episode-numbering and date
    /// suffixes while catching true repeats.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Only titles published within this many days are compared. Older
    /// duplicates are not detected; this bounds store query cost.
    #[serde(default = "default_recent_window_days")]
    pub recent_window_days: i64,
}

/// External analyzer endpoint (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    #[serde(default = "default_analyzer_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_analyzer_model")]
    pub model: String,
    /// Usually supplied via `--analyzer-api-key` / `ANALYZER_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Retry attempts for transient analyzer failures.
    #[serde(default = "default_analyzer_max_retries")]
    pub max_retries: usize,
}

/// Destination page-database settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default = "default_store_api_base")]
    pub api_base: String,
    /// Usually supplied via `--store-token` / `STORE_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    /// Usually supplied via `--store-database-id` / `STORE_DATABASE_ID`.
    #[serde(default)]
    pub database_id: Option<String>,
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; espanol-diario/0.1)".to_string()
}

fn default_max_passes() -> u32 {
    3
}

fn default_entries_per_alternative() -> usize {
    3
}

fn default_pass_pause_secs() -> u64 {
    3
}

fn default_similarity_threshold() -> f64 {
    0.90
}

fn default_recent_window_days() -> i64 {
    7
}

fn default_analyzer_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_analyzer_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_analyzer_max_retries() -> usize {
    5
}

fn default_store_api_base() -> String {
    "https://api.notion.com/v1".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
            entries_per_alternative: default_entries_per_alternative(),
            pass_pause_secs: default_pass_pause_secs(),
        }
    }
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            recent_window_days: default_recent_window_days(),
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analyzer_endpoint(),
            model: default_analyzer_model(),
            api_key: None,
            max_retries: default_analyzer_max_retries(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: default_store_api_base(),
            token: None,
            database_id: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or return defaults when no path is
    /// given.
    pub fn load(path: Option<&str>) -> Result<Config, Box<dyn Error>> {
        match path {
            Some(p) => {
                let raw = std::fs::read_to_string(Path::new(p))?;
                let config: Config = serde_yaml::from_str(&raw)?;
                info!(path = %p, "Loaded configuration");
                Ok(config)
            }
            None => {
                info!("No config file given; using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dedupe.similarity_threshold, 0.90);
        assert_eq!(config.dedupe.recent_window_days, 7);
        assert_eq!(config.cascade.max_passes, 3);
        assert_eq!(config.cascade.entries_per_alternative, 3);
        assert_eq!(config.http.request_timeout_secs, 15);
        assert!(config.store.token.is_none());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
dedupe:
  similarity_threshold: 0.85
cascade:
  max_passes: 2
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.dedupe.similarity_threshold, 0.85);
        // Untouched siblings keep their defaults.
        assert_eq!(config.dedupe.recent_window_days, 7);
        assert_eq!(config.cascade.max_passes, 2);
        assert_eq!(config.cascade.pass_pause_secs, 3);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let yaml = "dedupe:\n  similarity: 0.5\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_load_without_path_gives_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.analyzer.max_retries, 5);
    }
}
