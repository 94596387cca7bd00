//! Content classification: difficulty, topic, and analyzer annotations.
//!
//! Classification enriches a [`CandidateItem`] into a [`ClassifiedItem`].
//! It degrades, never fails: analyzer unavailability falls back to the
//! default tier and empty annotation sets, and classification failure is
//! not a rejection reason anywhere in the cascade.

use crate::analyzer::{
    Analyze, analyze_colloquialisms, analyze_difficulty, analyze_grammar, analyze_learning_goals,
};
use crate::extract;
use crate::links;
use crate::models::{Analysis, CandidateItem, ClassifiedItem, ContentKind, Tier, Topic};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Classification seam between the orchestrator and the network-touching
/// classifier. Test drivers substitute a canned implementation.
#[allow(async_fn_in_trait)]
pub trait ClassifyContent {
    /// Enrich a candidate. Must not fail: degraded inputs produce degraded
    /// but valid output.
    async fn classify(&self, candidate: CandidateItem) -> ClassifiedItem;
}

/// Production classifier: fetches article bodies, calls the analyzer, and
/// resolves listener-facing links for podcast episodes.
pub struct HttpClassifier<A> {
    client: reqwest::Client,
    analyzer: A,
    timeout: Duration,
}

impl<A: Analyze> HttpClassifier<A> {
    pub fn new(client: reqwest::Client, analyzer: A, timeout: Duration) -> Self {
        Self {
            client,
            analyzer,
            timeout,
        }
    }
}

impl<A: Analyze> ClassifyContent for HttpClassifier<A> {
    #[instrument(level = "info", skip_all, fields(source = candidate.source_id, kind = %candidate.content_type))]
    async fn classify(&self, candidate: CandidateItem) -> ClassifiedItem {
        // Body text: the page itself when reachable, the feed summary
        // otherwise. Empty text downstream means defaults, not errors.
        let body = extract::extract_body(&self.client, &candidate.raw_link, self.timeout).await;
        let text = if body.is_empty() {
            candidate.summary.clone().unwrap_or_default()
        } else {
            body
        };

        let item = match candidate.content_type {
            ContentKind::Article => {
                let (difficulty, topic, analysis) =
                    classify_article_text(&self.analyzer, &candidate.title, &text).await;
                let resolved_link = candidate.raw_link.clone();
                ClassifiedItem {
                    candidate,
                    difficulty,
                    topic,
                    duration: None,
                    episode_number: None,
                    resolved_link,
                    analysis,
                }
            }
            ContentKind::Podcast => {
                let (difficulty, topic, analysis) =
                    classify_podcast_text(&self.analyzer, &candidate.title, &text).await;
                let episode_number = extract_episode_number(&candidate.title);
                let duration = Some(extract_duration(
                    candidate.itunes_duration.as_deref(),
                    candidate.summary.as_deref(),
                ));
                let resolved_link = links::resolve_episode_link(
                    &self.client,
                    &candidate,
                    episode_number.as_deref(),
                    self.timeout,
                )
                .await;
                ClassifiedItem {
                    candidate,
                    difficulty,
                    topic,
                    duration,
                    episode_number,
                    resolved_link,
                    analysis,
                }
            }
        };

        if item.analysis.is_empty() {
            info!(
                tier = %item.difficulty,
                topic = %item.topic,
                "Classified with no annotations (analyzer degraded or nothing to annotate)"
            );
        }
        item
    }
}

/// Classify article text: difficulty, topic, grammar points, study goals.
pub async fn classify_article_text<A: Analyze>(
    analyzer: &A,
    title: &str,
    text: &str,
) -> (Tier, Topic, Analysis) {
    let difficulty = classify_difficulty(analyzer, text).await;
    let topic = classify_topic(title, text);

    let grammar_points = match analyze_grammar(analyzer, text, difficulty).await {
        Ok(points) => points.into_iter().unique().collect(),
        Err(e) => {
            warn!(error = %e, "Grammar analysis degraded to empty");
            Vec::new()
        }
    };
    let learning_goals =
        learning_goals_or_empty(analyzer, text, title, difficulty, grammar_points.len()).await;

    (
        difficulty,
        topic,
        Analysis {
            grammar_points,
            colloquialisms: Vec::new(),
            learning_goals,
        },
    )
}

/// Classify podcast text: difficulty, topic, colloquialisms, study goals.
pub async fn classify_podcast_text<A: Analyze>(
    analyzer: &A,
    title: &str,
    text: &str,
) -> (Tier, Topic, Analysis) {
    let difficulty = classify_difficulty(analyzer, text).await;
    let topic = classify_topic(title, text);

    let colloquialisms = match analyze_colloquialisms(analyzer, text, difficulty).await {
        Ok(found) => {
            if found.is_empty() {
                // Valid outcome: formal episodes contain no colloquialisms.
                info!("No colloquial expressions in this episode");
            }
            found.into_iter().unique().collect()
        }
        Err(e) => {
            warn!(error = %e, "Colloquialism analysis degraded to empty");
            Vec::new()
        }
    };
    let learning_goals =
        learning_goals_or_empty(analyzer, text, title, difficulty, colloquialisms.len()).await;

    (
        difficulty,
        topic,
        Analysis {
            grammar_points: Vec::new(),
            colloquialisms,
            learning_goals,
        },
    )
}

/// Difficulty with the documented degradation path: empty text or analyzer
/// failure yields [`Tier::DEFAULT`].
pub async fn classify_difficulty<A: Analyze>(analyzer: &A, text: &str) -> Tier {
    if text.trim().is_empty() {
        warn!("Empty text; using default difficulty tier");
        return Tier::DEFAULT;
    }
    match analyze_difficulty(analyzer, text).await {
        Ok(tier) => tier,
        Err(e) => {
            warn!(error = %e, default = %Tier::DEFAULT, "Difficulty analysis degraded to default");
            Tier::DEFAULT
        }
    }
}

async fn learning_goals_or_empty<A: Analyze>(
    analyzer: &A,
    text: &str,
    title: &str,
    tier: Tier,
    expression_count: usize,
) -> Vec<String> {
    match analyze_learning_goals(analyzer, text, title, tier, expression_count).await {
        Ok(goals) => goals.into_iter().unique().collect(),
        Err(e) => {
            warn!(error = %e, "Learning-goal analysis degraded to empty");
            Vec::new()
        }
    }
}

/// Keyword list for one taxonomy topic.
fn topic_keywords(topic: Topic) -> &'static [&'static str] {
    match topic {
        Topic::Politics => &[
            "gobierno", "política", "elecciones", "parlamento", "ministro", "presidente",
            "votación", "congreso", "democracia",
        ],
        Topic::Economy => &[
            "economía", "banco", "euro", "empleo", "crisis", "mercado", "dinero", "empresa",
            "inversión", "ahorros",
        ],
        Topic::Society => &["sociedad", "vivienda", "ciudadanos", "población", "gente", "vida"],
        Topic::Sports => &[
            "fútbol", "real madrid", "barcelona", "liga", "deporte", "partido", "champions",
        ],
        Topic::Technology => &[
            "tecnología", "internet", "móvil", "digital", "aplicaciones", "inteligencia",
            "innovación",
        ],
        Topic::Culture => &[
            "cultura", "arte", "música", "teatro", "festival", "libro", "cine", "tradición",
            "historia",
        ],
        Topic::International => &[
            "internacional", "mundial", "europa", "américa", "china", "estados unidos",
            "unión europea",
        ],
        Topic::Health => &["salud", "medicina", "hospital", "enfermedad", "médico", "sanidad"],
        Topic::Education => &["educación", "estudiantes", "universidad", "aprender"],
        Topic::Food => &["cocina", "comida", "receta", "gastronomía", "plato"],
        Topic::Travel => &["viajes", "turismo", "ciudades", "lugares", "destinos"],
        Topic::Grammar => &["gramática", "verbos", "subjuntivo", "pretérito", "sintaxis"],
        Topic::Family => &["familia", "padres", "hijos", "matrimonio", "casa"],
        Topic::Work => &["trabajo", "profesión", "carrera", "oficina"],
        Topic::General => &[],
    }
}

/// Keyword-scoring topic classification over the fixed taxonomy.
///
/// Each keyword present in title+text scores one point for its topic. The
/// highest score wins; ties go to the first topic in [`Topic::ALL`] order;
/// zero matches yield [`Topic::General`].
pub fn classify_topic(title: &str, text: &str) -> Topic {
    let haystack = format!("{title} {text}").to_lowercase();

    let mut best = Topic::General;
    let mut best_score = 0usize;
    for topic in Topic::ALL {
        let score = topic_keywords(topic)
            .iter()
            .filter(|kw| haystack.contains(*kw))
            .count();
        // Strictly greater keeps the earliest topic on ties.
        if score > best_score {
            best = topic;
            best_score = score;
        }
    }
    best
}

static EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)episodio\s*(\d+)",
        r"(?i)episode\s*(\d+)",
        r"(?i)ep\.?\s*(\d+)",
        r"#(\d+)",
        r"(\d{3,4})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Pull an episode number out of a title, trying the explicit markers
/// before falling back to a bare 3-4 digit run.
pub fn extract_episode_number(title: &str) -> Option<String> {
    EPISODE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

static SUMMARY_DURATION_MMSS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+):(\d{2})").unwrap());
static SUMMARY_DURATION_MIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*min").unwrap());

/// Fallback shown when no duration can be determined; typical episode
/// length for the catalog's shows.
const DEFAULT_DURATION: &str = "15-25 min";

/// Derive a human-readable duration for a podcast entry.
///
/// `itunes:duration` comes first (plain seconds are converted to `mm:ss`,
/// anything else passes through); then duration-looking patterns in the
/// summary; then the default range.
pub fn extract_duration(itunes_duration: Option<&str>, summary: Option<&str>) -> String {
    if let Some(raw) = itunes_duration {
        let raw = raw.trim();
        if let Ok(total_seconds) = raw.parse::<u64>() {
            return format!("{}:{:02}", total_seconds / 60, total_seconds % 60);
        }
        if !raw.is_empty() {
            return raw.to_string();
        }
    }

    if let Some(summary) = summary {
        if let Some(caps) = SUMMARY_DURATION_MMSS.captures(summary) {
            return format!("{}:{}", &caps[1], &caps[2]);
        }
        if let Some(caps) = SUMMARY_DURATION_MIN.captures(summary) {
            return format!("{} min", &caps[1]);
        }
    }

    DEFAULT_DURATION.to_string()
}
