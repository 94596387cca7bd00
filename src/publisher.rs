//! Destination store collaborator: a Notion-style page database.
//!
//! The engine treats the store as append-only: it reads recent page titles
//! (for the duplicate guard) and performs a single independent page create
//! per accepted item. There are no read-modify-write transactions; if two
//! runs overlap, title similarity within the recent window is the only
//! protection against double-publishing, an accepted and documented race.

use crate::models::{ClassifiedItem, ContentKind};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors from the destination store.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Network-level failure or timeout.
    #[error("store request failed: {0}")]
    Request(String),
    /// Non-2xx response from the store API.
    #[error("store returned status {0}")]
    Status(u16),
    /// Response body did not match the expected shape.
    #[error("malformed store response: {0}")]
    Response(String),
}

/// Seam between the engine and the destination store.
///
/// `recent_titles` backs the duplicate guard; `publish` persists an
/// accepted item and returns the created page URL.
#[allow(async_fn_in_trait)]
pub trait PublishStore {
    /// Titles of pages of this kind whose title contains `title_prefix`
    /// and which were created after `created_after`.
    async fn recent_titles(
        &self,
        title_prefix: &str,
        kind: ContentKind,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<String>, PublishError>;

    /// Create a page for the item; returns the page URL.
    async fn publish(&self, item: &ClassifiedItem) -> Result<String, PublishError>;
}

/// Production store client against the Notion HTTP API.
#[derive(Debug, Clone)]
pub struct NotionStore {
    client: reqwest::Client,
    api_base: String,
    token: String,
    database_id: String,
    timeout: Duration,
}

const NOTION_VERSION: &str = "2022-06-28";

impl NotionStore {
    pub fn new(
        client: reqwest::Client,
        api_base: String,
        token: String,
        database_id: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_base,
            token,
            database_id,
            timeout,
        }
    }

    fn request(&self, url: String, payload: Value) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .timeout(self.timeout)
            .json(&payload)
    }
}

impl PublishStore for NotionStore {
    #[instrument(level = "info", skip_all, fields(prefix = %title_prefix, kind = %kind))]
    async fn recent_titles(
        &self,
        title_prefix: &str,
        kind: ContentKind,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<String>, PublishError> {
        let payload = json!({
            "filter": {
                "and": [
                    { "property": "title", "title": { "contains": title_prefix } },
                    { "property": "type", "select": { "equals": kind.to_string() } },
                    {
                        "timestamp": "created_time",
                        "created_time": { "after": created_after.to_rfc3339() }
                    }
                ]
            },
            "sorts": [
                { "timestamp": "created_time", "direction": "descending" }
            ]
        });

        let url = format!("{}/databases/{}/query", self.api_base, self.database_id);
        let response = self
            .request(url, payload)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PublishError::Response(e.to_string()))?;
        let titles = extract_page_titles(&body);
        info!(count = titles.len(), "Queried recent page titles");
        Ok(titles)
    }

    #[instrument(level = "info", skip_all, fields(title = %item.candidate.title, kind = %item.candidate.content_type))]
    async fn publish(&self, item: &ClassifiedItem) -> Result<String, PublishError> {
        let mut properties = json!({
            "title": {
                "title": [ { "text": { "content": item.candidate.title } } ]
            },
            "URL": { "url": item.resolved_link },
            "type": { "select": { "name": item.candidate.content_type.to_string() } },
            "category": { "select": { "name": item.topic.to_string() } },
            "difficulty": { "select": { "name": item.difficulty.to_string() } },
            "memo": {
                "rich_text": [ { "text": { "content": study_memo(item) } } ]
            }
        });
        if let Some(duration) = &item.duration {
            properties["duration"] = json!({
                "rich_text": [ { "text": { "content": duration } } ]
            });
        }

        let payload = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        });

        let url = format!("{}/pages", self.api_base);
        let response = self
            .request(url, payload)
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PublishError::Response(e.to_string()))?;
        let page_url = body
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| PublishError::Response("page response carried no url".to_string()))?
            .to_string();

        info!(%page_url, "Published page");
        Ok(page_url)
    }
}

/// Walk a database query response and pull each page's title text.
fn extract_page_titles(body: &Value) -> Vec<String> {
    let Some(results) = body.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|page| {
            let properties = page.get("properties")?.as_object()?;
            properties.values().find_map(|prop| {
                if prop.get("type")?.as_str()? != "title" {
                    return None;
                }
                let text = prop
                    .get("title")?
                    .as_array()?
                    .first()?
                    .get("text")?
                    .get("content")?
                    .as_str()?;
                Some(text.to_string())
            })
        })
        .collect()
}

/// Compose the study memo stored on the page.
///
/// One line of orientation plus whatever the analyzer found; empty
/// annotation sets get an explicit note so the learner knows analysis ran.
pub fn study_memo(item: &ClassifiedItem) -> String {
    let mut parts: Vec<String> = Vec::new();

    match item.candidate.content_type {
        ContentKind::Article => {
            parts.push(format!(
                "Artículo de {} (nivel {})",
                item.topic, item.difficulty
            ));
            if let Some(published) = item.candidate.published_at {
                parts.push(format!("Publicado: {}", published.format("%Y-%m-%d")));
            }
            if item.analysis.grammar_points.is_empty() {
                parts.push("Gramática: sin estructuras destacadas".to_string());
            } else {
                parts.push(format!(
                    "Gramática: {}",
                    item.analysis.grammar_points.join(" | ")
                ));
            }
        }
        ContentKind::Podcast => {
            let mut header = format!("Podcast de {} (nivel {})", item.topic, item.difficulty);
            if let Some(n) = &item.episode_number {
                header.push_str(&format!(" · Ep. {n}"));
            }
            if let Some(d) = &item.duration {
                header.push_str(&format!(" · {d}"));
            }
            parts.push(header);
            if item.analysis.colloquialisms.is_empty() {
                parts.push("Coloquial: sin expresiones coloquiales en este episodio".to_string());
            } else {
                parts.push(format!(
                    "Coloquial: {}",
                    item.analysis.colloquialisms.join(" | ")
                ));
            }
        }
    }

    if !item.analysis.learning_goals.is_empty() {
        parts.push(format!("Objetivos: {}", item.analysis.learning_goals.join(" | ")));
    }

    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, CandidateItem, Tier, Topic};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(kind: ContentKind) -> ClassifiedItem {
        ClassifiedItem {
            candidate: CandidateItem {
                title: "Episodio 42: La crisis".to_string(),
                raw_link: "https://example.es/ep42".to_string(),
                published_at: None,
                summary: None,
                content_type: kind,
                source_id: "hoy-hablamos",
                feed_index: 0,
                itunes_duration: None,
            },
            difficulty: Tier::B2,
            topic: Topic::Economy,
            duration: Some("23:41".to_string()),
            episode_number: Some("42".to_string()),
            resolved_link: "https://example.es/ep42".to_string(),
            analysis: Analysis {
                grammar_points: vec![],
                colloquialisms: vec!["o sea (es decir)".to_string()],
                learning_goals: vec!["repasar el subjuntivo".to_string()],
            },
        }
    }

    fn store(server: &MockServer) -> NotionStore {
        NotionStore::new(
            reqwest::Client::new(),
            server.uri(),
            "secret-token".to_string(),
            "db-123".to_string(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_recent_titles_extracts_title_properties() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "results": [
                { "properties": { "title": {
                    "type": "title",
                    "title": [ { "text": { "content": "Episodio 41: El campo" } } ]
                } } },
                { "properties": { "Nombre": {
                    "type": "title",
                    "title": [ { "text": { "content": "Episodio 40: La mar" } } ]
                } } }
            ]
        });
        Mock::given(method("POST"))
            .and(path("/databases/db-123/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let titles = store(&server)
            .recent_titles("Episodio", ContentKind::Podcast, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            titles,
            vec![
                "Episodio 41: El campo".to_string(),
                "Episodio 40: La mar".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_recent_titles_propagates_store_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        match store(&server)
            .recent_titles("x", ContentKind::Article, Utc::now())
            .await
        {
            Err(PublishError::Status(503)) => {}
            other => panic!("expected Status(503), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_returns_page_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://notion.example/p/abc123"
            })))
            .mount(&server)
            .await;

        let url = store(&server).publish(&item(ContentKind::Podcast)).await.unwrap();
        assert_eq!(url, "https://notion.example/p/abc123");
    }

    #[tokio::test]
    async fn test_publish_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        match store(&server).publish(&item(ContentKind::Article)).await {
            Err(PublishError::Status(400)) => {}
            other => panic!("expected Status(400), got {other:?}"),
        }
    }

    #[test]
    fn test_study_memo_podcast_mentions_episode_and_expressions() {
        let memo = study_memo(&item(ContentKind::Podcast));
        assert!(memo.contains("Ep. 42"));
        assert!(memo.contains("23:41"));
        assert!(memo.contains("o sea"));
        assert!(memo.contains("Objetivos"));
    }

    #[test]
    fn test_study_memo_article_notes_empty_grammar() {
        let mut article = item(ContentKind::Article);
        article.analysis.colloquialisms.clear();
        article.candidate.published_at = Some(
            DateTime::parse_from_rfc3339("2026-08-05T10:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let memo = study_memo(&article);
        assert!(memo.contains("Artículo de economy"));
        assert!(memo.contains("Publicado: 2026-08-05"));
        assert!(memo.contains("sin estructuras destacadas"));
    }
}
