//! Feed resolution: fetch a source's feed and select one candidate entry.
//!
//! Fetching is behind the [`FetchFeed`] trait so the orchestrator can be
//! driven by canned feeds in tests; [`HttpFeedFetcher`] is the production
//! implementation. Selection applies the recency filter and, for podcast
//! sources, a lexical Spanish-language gate.

use crate::feeds::parser::{self, FeedEntry};
use crate::models::{CandidateItem, ContentKind, Source};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Why a source produced no feed document.
///
/// The orchestrator treats every kind identically ("no usable candidate
/// from this source") but the distinction matters in logs when a feed has
/// died permanently.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure, timeout, or a non-2xx HTTP status.
    #[error("feed unreachable: {0}")]
    Unreachable(String),
    /// The document parsed but contained zero entries.
    #[error("feed contained no entries")]
    Empty,
    /// The document could not be parsed as RSS or Atom.
    #[error("malformed feed: {0}")]
    Malformed(String),
}

/// A fetched, parsed feed together with the source it came from.
#[derive(Debug, Clone)]
pub struct FeedDocument {
    pub source: &'static Source,
    pub entries: Vec<FeedEntry>,
}

/// Fetch seam between the orchestrator and the network.
#[allow(async_fn_in_trait)]
pub trait FetchFeed {
    async fn fetch(&self, source: &'static Source) -> Result<FeedDocument, FetchError>;
}

/// Production fetcher: HTTP GET with a bounded timeout, then parse.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl FetchFeed for HttpFeedFetcher {
    #[instrument(level = "info", skip_all, fields(source = source.id))]
    async fn fetch(&self, source: &'static Source) -> Result<FeedDocument, FetchError> {
        let response = self
            .client
            .get(source.feed_endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unreachable(format!("HTTP status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let entries =
            parser::parse_feed(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        if entries.is_empty() {
            return Err(FetchError::Empty);
        }

        info!(
            count = entries.len(),
            source = source.id,
            region = source.region,
            "Fetched feed"
        );
        Ok(FeedDocument { source, entries })
    }
}

/// How to pick an entry out of a feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// First entry that passes the gates.
    Primary,
    /// Start at `offset` instead of the top, so a fallback pass does not
    /// re-surface the entry that triggered it.
    Alternate { offset: usize },
}

/// Select one candidate from a fetched feed.
///
/// Scans the window of `max_inspect` entries starting at the mode's offset,
/// in feed order, and returns the first entry that is not `already_tried`
/// and passes the recency filter and (for podcasts) the language gate.
/// Returns `None` when no entry in the window qualifies.
///
/// `already_tried` is the orchestrator's (source, candidate) bookkeeping:
/// an entry inspected earlier in the run is never re-selected, even when a
/// later pass revisits the source.
pub fn select_candidate(
    doc: &FeedDocument,
    mode: SelectionMode,
    max_inspect: usize,
    already_tried: impl Fn(usize) -> bool,
) -> Option<CandidateItem> {
    let start = match mode {
        SelectionMode::Primary => 0,
        SelectionMode::Alternate { offset } => offset.min(doc.entries.len().saturating_sub(1)),
    };

    for (inspected, (index, entry)) in doc.entries.iter().enumerate().skip(start).enumerate() {
        if inspected >= max_inspect {
            break;
        }
        if already_tried(index) {
            continue;
        }
        if !is_recent_enough(entry) {
            debug!(source = doc.source.id, index, "Entry rejected by recency filter");
            continue;
        }
        if doc.source.kind == ContentKind::Podcast && !passes_language_gate(entry) {
            warn!(
                source = doc.source.id,
                index,
                title = %entry.title,
                "Entry skipped by language gate (not Spanish)"
            );
            continue;
        }
        debug!(source = doc.source.id, index, title = %entry.title, "Selected candidate");
        return Some(CandidateItem {
            title: entry.title.clone(),
            raw_link: entry
                .link
                .clone()
                .unwrap_or_else(|| doc.source.base_link_template.to_string()),
            published_at: entry.published,
            summary: entry.summary.clone(),
            content_type: doc.source.kind,
            source_id: doc.source.id,
            feed_index: index,
            itunes_duration: entry.itunes_duration.clone(),
        });
    }
    None
}

/// Permissive recency filter.
///
/// Feed date formats are inconsistent enough that a strict window starves
/// the pipeline on false negatives, so every entry passes. The seam is kept
/// so a strict window can be reinstated without touching callers.
fn is_recent_enough(_entry: &FeedEntry) -> bool {
    true
}

/// Lexical language gate for mixed-language podcast feeds.
///
/// Counts occurrences of Spanish vs. English function words over the
/// lowercased title and summary; the candidate passes when Spanish hits
/// strictly outnumber English hits. Failing candidates are skipped, not
/// deprioritized.
fn passes_language_gate(entry: &FeedEntry) -> bool {
    let text = format!(
        " {} {} ",
        entry.title,
        entry.summary.as_deref().unwrap_or("")
    )
    .to_lowercase();

    looks_spanish(&text)
}

const SPANISH_FUNCTION_WORDS: [&str; 10] = [
    " el ", " la ", " es ", " que ", " con ", " de ", " en ", " por ", " para ", "ñ",
];
const ENGLISH_FUNCTION_WORDS: [&str; 8] = [
    " the ", " and ", " is ", " are ", " was ", " were ", " this ", " that ",
];

pub(crate) fn looks_spanish(text: &str) -> bool {
    let spanish_hits: usize = SPANISH_FUNCTION_WORDS
        .iter()
        .map(|w| text.matches(w).count())
        .sum();
    let english_hits: usize = ENGLISH_FUNCTION_WORDS
        .iter()
        .map(|w| text.matches(w).count())
        .sum();
    spanish_hits > english_hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(title: &str, summary: Option<&str>) -> FeedEntry {
        FeedEntry {
            title: title.to_string(),
            link: Some(format!("https://example.es/{}", title.len())),
            published: None,
            summary: summary.map(|s| s.to_string()),
            itunes_duration: None,
        }
    }

    fn doc(source_id: &str, entries: Vec<FeedEntry>) -> FeedDocument {
        FeedDocument {
            source: catalog::find(source_id).unwrap(),
            entries,
        }
    }

    #[test]
    fn test_primary_selects_first_entry() {
        let doc = doc(
            "veinteminutos",
            vec![entry("Primera noticia", None), entry("Segunda noticia", None)],
        );
        let candidate = select_candidate(&doc, SelectionMode::Primary, 3, |_| false).unwrap();
        assert_eq!(candidate.title, "Primera noticia");
        assert_eq!(candidate.feed_index, 0);
        assert_eq!(candidate.source_id, "veinteminutos");
    }

    #[test]
    fn test_alternate_mode_starts_at_offset() {
        let doc = doc(
            "veinteminutos",
            vec![
                entry("Primera", None),
                entry("Segunda", None),
                entry("Tercera", None),
            ],
        );
        let candidate =
            select_candidate(&doc, SelectionMode::Alternate { offset: 2 }, 3, |_| false).unwrap();
        assert_eq!(candidate.title, "Tercera");
        assert_eq!(candidate.feed_index, 2);
    }

    #[test]
    fn test_alternate_offset_clamped_to_last_entry() {
        let doc = doc("veinteminutos", vec![entry("Única", None)]);
        let candidate =
            select_candidate(&doc, SelectionMode::Alternate { offset: 9 }, 3, |_| false).unwrap();
        assert_eq!(candidate.feed_index, 0);
    }

    #[test]
    fn test_language_gate_skips_english_podcast_entries() {
        let doc = doc(
            "radio-ambulante",
            vec![
                entry(
                    "The Daily: what happened this week",
                    Some("This is the news that was made for you and the world."),
                ),
                entry(
                    "El precio del agua",
                    Some("En este episodio hablamos de la sequía que afecta a la región."),
                ),
            ],
        );
        let candidate = select_candidate(&doc, SelectionMode::Primary, 3, |_| false).unwrap();
        assert_eq!(candidate.title, "El precio del agua");
        assert_eq!(candidate.feed_index, 1);
    }

    #[test]
    fn test_language_gate_not_applied_to_articles() {
        let doc = doc(
            "elpais-portada",
            vec![entry("The global outlook", Some("All in English, the whole thing is."))],
        );
        // Article feeds are trusted; the gate only runs for podcasts.
        assert!(select_candidate(&doc, SelectionMode::Primary, 3, |_| false).is_some());
    }

    #[test]
    fn test_max_inspect_bounds_the_scan() {
        let doc = doc(
            "radio-ambulante",
            vec![
                entry("The one in English", Some("This is the first and it is the one.")),
                entry("The other in English", Some("That one was also the same thing.")),
                entry("La buena", Some("Un episodio sobre la vida en el campo de España.")),
            ],
        );
        // Only two entries may be inspected; the Spanish one is third.
        assert!(select_candidate(&doc, SelectionMode::Primary, 2, |_| false).is_none());
        assert!(select_candidate(&doc, SelectionMode::Primary, 3, |_| false).is_some());
    }

    #[test]
    fn test_looks_spanish() {
        assert!(looks_spanish(" hoy hablamos de la vida en el pueblo "));
        assert!(!looks_spanish(" the daily show about this and that "));
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        let source = test_source(&server);
        match fetcher.fetch(source).await {
            Err(FetchError::Unreachable(msg)) => assert!(msg.contains("404")),
            other => panic!("expected Unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel><item>"))
            .mount(&server)
            .await;

        let fetcher = HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        match fetcher.fetch(test_source(&server)).await {
            Err(FetchError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<rss version="2.0"><channel></channel></rss>"#),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        match fetcher.fetch(test_source(&server)).await {
            Err(FetchError::Empty) => {}
            other => panic!("expected Empty, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        let body = r#"<rss version="2.0"><channel>
            <item><title>Una noticia</title><link>https://example.es/n/1</link></item>
        </channel></rss>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let fetcher = HttpFeedFetcher::new(reqwest::Client::new(), Duration::from_secs(5));
        let doc = fetcher.fetch(test_source(&server)).await.unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].title, "Una noticia");
    }

    /// Leak a source whose endpoint points at the mock server. The catalog
    /// is `&'static`, so test sources must be too.
    fn test_source(server: &MockServer) -> &'static Source {
        Box::leak(Box::new(Source {
            id: "test-feed",
            name: "Test Feed",
            kind: ContentKind::Article,
            priority_rank: 1,
            feed_endpoint: Box::leak(server.uri().into_boxed_str()),
            region: "España",
            base_link_template: "https://example.es/",
        }))
    }
}
