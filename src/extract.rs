//! Article body extraction from source pages.
//!
//! A dumb text-extraction utility: site-specific selectors for the two
//! reading sources whose templates are known, then a generic fallback that
//! collects paragraph-like blocks. Output is capped at 2000 characters to
//! bound downstream analyzer cost.
//!
//! Extraction failure is never an error for the pipeline; callers fall
//! back to the feed summary.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Maximum body length handed to the analyzer.
const BODY_CAP: usize = 2000;
/// Minimum paragraph length considered real content in the last-resort scan.
const MIN_PARAGRAPH_LEN: usize = 50;

static TWENTYMINUTOS_BODY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.article-text p, div.content p").unwrap());
static ELPAIS_BODY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[data-dtm-region=\"articulo_cuerpo\"] p, div.a_c p, div.articulo-cuerpo p")
        .unwrap()
});
static GENERIC_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("article p, main p").unwrap());
static ANY_PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Fetch a page and extract its article body.
///
/// Returns an empty string on any failure; the caller decides what to fall
/// back to (usually the feed summary).
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn extract_body(client: &reqwest::Client, url: &str, timeout: Duration) -> String {
    let html = match fetch_page(client, url, timeout).await {
        Ok(html) => html,
        Err(e) => {
            warn!(%url, error = %e, "Body fetch failed; caller will fall back to summary");
            return String::new();
        }
    };
    let body = extract_from_html(&html, url);
    debug!(bytes = body.len(), "Extracted article body");
    body
}

async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, reqwest::Error> {
    client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Pure extraction over an HTML document.
///
/// Site-specific selectors first; generic `article`/`main` paragraphs next
/// (first 10); as a last resort any paragraph above the minimum length
/// (first 8). Always capped at [`BODY_CAP`] characters.
pub fn extract_from_html(html: &str, url: &str) -> String {
    let document = Html::parse_document(html);

    let mut content = if url.contains("20minutos.es") {
        join_paragraphs(&document, &TWENTYMINUTOS_BODY, usize::MAX, 0)
    } else if url.contains("elpais.com") {
        join_paragraphs(&document, &ELPAIS_BODY, usize::MAX, 0)
    } else {
        String::new()
    };

    if content.is_empty() {
        content = join_paragraphs(&document, &GENERIC_BODY, 10, 0);
    }
    if content.len() < 200 {
        let rescued = join_paragraphs(&document, &ANY_PARAGRAPH, 8, MIN_PARAGRAPH_LEN);
        if rescued.len() > content.len() {
            content = rescued;
        }
    }

    cap_chars(&content, BODY_CAP)
}

fn join_paragraphs(document: &Html, selector: &Selector, max: usize, min_len: usize) -> String {
    document
        .select(selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|text| !text.is_empty() && text.len() > min_len)
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

fn cap_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
