//! Command-line interface definitions for Español Diario.
//!
//! All options can be provided via command-line flags; secrets can also come
//! from environment variables so CI schedulers never put them on a command
//! line.

use clap::Parser;

/// Command-line arguments for the Español Diario engine.
///
/// # Examples
///
/// ```sh
/// # Run for today with defaults
/// espanol_diario
///
/// # Explicit config and date (useful for backfills and tests)
/// espanol_diario -c config.yaml --date 2026-08-06
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to the YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Run date (YYYY-MM-DD); defaults to today. Determines the day's
    /// primary sources.
    #[arg(long)]
    pub date: Option<chrono::NaiveDate>,

    /// API key for the external text analyzer
    #[arg(long, env = "ANALYZER_API_KEY", hide_env_values = true)]
    pub analyzer_api_key: Option<String>,

    /// Token for the destination page database
    #[arg(long, env = "STORE_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// Database id in the destination store
    #[arg(long, env = "STORE_DATABASE_ID")]
    pub store_database_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["espanol_diario"]);
        assert!(cli.config.is_none());
        assert!(cli.date.is_none());
    }

    #[test]
    fn test_cli_parsing_date_and_config() {
        let cli = Cli::parse_from(["espanol_diario", "-c", "conf.yaml", "--date", "2026-08-06"]);
        assert_eq!(cli.config.as_deref(), Some("conf.yaml"));
        assert_eq!(
            cli.date,
            Some(chrono::NaiveDate::from_ymd_opt(2026, 8, 6).unwrap())
        );
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["espanol_diario", "--date", "not-a-date"]).is_err());
    }
}
