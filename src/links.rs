//! Listener-facing link resolution for podcast episodes.
//!
//! Feed entry links are often feed-internal redirects or dead hosts, so an
//! accepted episode gets a better link before publication:
//!
//! 1. Radio Ambulante episodes prefer the show's own website, with the URL
//!    derived by slugifying the episode title (falling back to a URL found
//!    in the summary).
//! 2. Everything else queries the iTunes Search API with a cascade of
//!    search terms, matching results by collection name and title tokens.
//! 3. Candidate URLs are validated with a bounded HEAD request; when
//!    nothing validates, the source's base link is used.
//!
//! Resolution only ever degrades to the base link; it never rejects an
//! item.

use crate::models::CandidateItem;
use crate::utils::slugify_title;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const ITUNES_SEARCH_URL: &str = "https://itunes.apple.com/search";

/// Words too generic to identify an episode in a search query.
const STOPWORDS: [&str; 8] = ["the", "and", "for", "with", "episode", "episodio", "ep", "del"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default, rename = "collectionName")]
    collection_name: String,
    #[serde(default, rename = "trackName")]
    track_name: String,
    #[serde(default, rename = "trackViewUrl")]
    track_view_url: String,
}

/// Resolve the link to publish for a podcast candidate.
#[instrument(level = "info", skip_all, fields(source = candidate.source_id, title = %candidate.title))]
pub async fn resolve_episode_link(
    client: &reqwest::Client,
    candidate: &CandidateItem,
    episode_number: Option<&str>,
    timeout: Duration,
) -> String {
    let source = match crate::catalog::find(candidate.source_id) {
        Some(source) => source,
        None => return candidate.raw_link.clone(),
    };

    // Radio Ambulante publishes full episodes on its own site; that link
    // beats any store page.
    if candidate.source_id == "radio-ambulante" {
        if let Some(url) = radio_ambulante_url(&candidate.title, candidate.summary.as_deref()) {
            if validate_url(client, &url, timeout).await {
                info!(%url, "Using show website link");
                return url;
            }
        }
    }

    if let Some(url) = search_itunes_episode(
        client,
        source.name,
        &candidate.title,
        episode_number,
        timeout,
    )
    .await
    {
        if validate_url(client, &url, timeout).await {
            info!(%url, "Using store episode link");
            return url;
        }
    }

    // The raw feed link is still better than the show page when it loads.
    if validate_url(client, &candidate.raw_link, timeout).await {
        return candidate.raw_link.clone();
    }

    warn!(fallback = source.base_link_template, "All episode links failed validation");
    source.base_link_template.to_string()
}

/// Derive the Radio Ambulante website URL for an episode.
///
/// The site keys episodes by slugified title; when that guess looks wrong
/// the summary sometimes carries the canonical URL.
pub fn radio_ambulante_url(title: &str, summary: Option<&str>) -> Option<String> {
    static SUMMARY_URL: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"https://radioambulante\.org/audio/[^\s<>"]+"#).unwrap());

    let slug = slugify_title(title);
    if !slug.is_empty() {
        return Some(format!("https://radioambulante.org/audio/{slug}"));
    }
    summary
        .and_then(|s| SUMMARY_URL.find(s))
        .map(|m| m.as_str().to_string())
}

/// Search the iTunes store for the exact episode page.
///
/// Tries a cascade of search terms from most to least specific and returns
/// the first result whose collection matches the show and whose track name
/// shares enough tokens with the episode title.
async fn search_itunes_episode(
    client: &reqwest::Client,
    show_name: &str,
    episode_title: &str,
    episode_number: Option<&str>,
    timeout: Duration,
) -> Option<String> {
    for term in search_terms(show_name, episode_title, episode_number) {
        let url = format!(
            "{ITUNES_SEARCH_URL}?term={}&media=podcast&entity=podcastEpisode&limit=50",
            urlencoding::encode(&term)
        );
        debug!(%term, "Searching store for episode");

        let response = match client.get(&url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Store search failed");
                continue;
            }
        };
        let parsed: SearchResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Store search returned unparseable body");
                continue;
            }
        };

        for result in &parsed.results {
            if result.track_view_url.is_empty() {
                continue;
            }
            if collection_matches(show_name, &result.collection_name)
                && title_matches(episode_title, &result.track_name)
            {
                return Some(result.track_view_url.clone());
            }
        }
    }
    None
}

/// Build the search-term cascade, most specific first.
fn search_terms(show_name: &str, episode_title: &str, episode_number: Option<&str>) -> Vec<String> {
    let mut terms = vec![format!("{show_name} {episode_title}")];

    if let Some(n) = episode_number {
        terms.push(format!("{show_name} {n}"));
    }
    terms.push(episode_title.to_string());

    // Colon-split titles ("La red: el apagón") search well by either half.
    if let Some((main, subtitle)) = episode_title.split_once(':') {
        terms.push(format!("{show_name} {}", main.trim()));
        terms.push(format!("{show_name} {}", subtitle.trim()));
    }

    // Keyword subset: the two most identifying words of the title.
    let keywords: Vec<&str> = episode_title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.len() > 3 && !STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    if keywords.len() >= 2 {
        terms.push(format!("{show_name} {} {}", keywords[0], keywords[1]));
    }

    terms
}

/// Does a store collection name belong to this show?
fn collection_matches(show_name: &str, collection_name: &str) -> bool {
    let collection = collection_name.to_lowercase();
    let compact_show = show_name.to_lowercase().replace(' ', "");
    if collection.replace(' ', "").contains(&compact_show) {
        return true;
    }
    show_name
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .any(|w| collection.contains(&w.to_lowercase()))
}

/// Does a store track name plausibly name this episode?
///
/// Two shared meaningful tokens, or one long distinctive token, counts as
/// a match; store titles routinely add numbering and dates around the real
/// title.
fn title_matches(episode_title: &str, track_name: &str) -> bool {
    let track = track_name.to_lowercase();
    let title_words: Vec<String> = episode_title
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();

    let shared = title_words.iter().filter(|w| track.contains(*w)).count();
    if shared >= 2 {
        return true;
    }
    title_words
        .iter()
        .any(|w| w.len() > 4 && !STOPWORDS.contains(&w.as_str()) && track.contains(w))
}

/// Quick reachability probe: HEAD request, any status below 400 passes.
pub async fn validate_url(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return false;
    }
    match client.head(url).timeout(timeout).send().await {
        Ok(response) => response.status().as_u16() < 400,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_search_terms_cascade() {
        let terms = search_terms("Hoy Hablamos", "Episodio 42: La crisis", Some("42"));
        assert_eq!(terms[0], "Hoy Hablamos Episodio 42: La crisis");
        assert_eq!(terms[1], "Hoy Hablamos 42");
        assert_eq!(terms[2], "Episodio 42: La crisis");
        assert!(terms.contains(&"Hoy Hablamos Episodio 42".to_string()));
        assert!(terms.contains(&"Hoy Hablamos La crisis".to_string()));
    }

    #[test]
    fn test_search_terms_keyword_subset() {
        let terms = search_terms("Radio Ambulante", "El precio invisible del agua", None);
        assert!(terms.contains(&"Radio Ambulante precio invisible".to_string()));
    }

    #[test]
    fn test_collection_matching() {
        assert!(collection_matches("Hoy Hablamos", "Hoy Hablamos: podcast diario"));
        assert!(collection_matches("SpanishPodcast", "spanishpodcast.net"));
        assert!(!collection_matches("Hoy Hablamos", "The Daily"));
    }

    #[test]
    fn test_title_matching() {
        assert!(title_matches(
            "Episodio 42: La crisis",
            "Episodio 42 - La crisis económica"
        ));
        assert!(title_matches("El turrón", "1500. El turrón de Navidad"));
        assert!(!title_matches("El turrón", "Noticias de la semana"));
    }

    #[test]
    fn test_radio_ambulante_url_from_slug() {
        assert_eq!(
            radio_ambulante_url("El precio del agua", None),
            Some("https://radioambulante.org/audio/el-precio-del-agua".to_string())
        );
    }

    #[test]
    fn test_radio_ambulante_url_from_summary() {
        let summary = "Escúchalo en https://radioambulante.org/audio/el-precio-del-agua hoy";
        assert_eq!(
            radio_ambulante_url("¡¡¡", Some(summary)),
            Some("https://radioambulante.org/audio/el-precio-del-agua".to_string())
        );
    }

    #[tokio::test]
    async fn test_validate_url_rejects_non_http() {
        let client = reqwest::Client::new();
        assert!(!validate_url(&client, "ftp://example.es/x", Duration::from_secs(1)).await);
        assert!(!validate_url(&client, "", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_validate_url_head_probe() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        assert!(validate_url(&client, &format!("{}/ok", server.uri()), Duration::from_secs(5)).await);
        assert!(
            !validate_url(&client, &format!("{}/gone", server.uri()), Duration::from_secs(5)).await
        );
    }
}
