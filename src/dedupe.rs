//! Near-duplicate detection against recently published material.
//!
//! Titles are normalized (lowercased, punctuation stripped), tokenized on
//! whitespace, and compared by Jaccard similarity over token sets. A pair
//! at or above the configured threshold (default 0.90) is the same
//! material; the high bar tolerates episode-numbering and date suffixes
//! while catching true repeats.
//!
//! Only titles created within the configured recent window are compared,
//! which bounds store query cost. Duplicates older than the window are not
//! detected; a documented limitation, not a defect.
//!
//! On store query failure the guard **fails open**: it reports "no
//! duplicate" so the pipeline keeps moving instead of blocking on
//! infrastructure failure.

use crate::config::DedupeConfig;
use crate::models::ContentKind;
use crate::publisher::PublishStore;
use chrono::{Duration, Utc};
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Lowercase and strip punctuation, keeping letters, digits, and spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

fn token_set(title: &str) -> HashSet<String> {
    normalize_title(title)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity over normalized token sets.
///
/// Returns 0.0 when either side has no tokens; two empty titles are not
/// considered the same material.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let set_a = token_set(a);
    let set_b = token_set(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Would publishing this title duplicate recently published material?
///
/// Queries the store for pages of the same kind created within the recent
/// window whose title contains the candidate's prefix, then compares each
/// by token Jaccard. Store failure fails open.
#[instrument(level = "info", skip_all, fields(title = %title, kind = %kind))]
pub async fn exists_similar<S: PublishStore>(
    store: &S,
    config: &DedupeConfig,
    title: &str,
    kind: ContentKind,
) -> bool {
    let prefix: String = title.chars().take(50).collect();
    let created_after = Utc::now() - Duration::days(config.recent_window_days);

    let existing = match store.recent_titles(&prefix, kind, created_after).await {
        Ok(titles) => titles,
        Err(e) => {
            // Fail open: availability over precision when the store is down.
            warn!(error = %e, "Duplicate query failed; treating as no duplicate");
            return false;
        }
    };

    for existing_title in &existing {
        let similarity = token_jaccard(title, existing_title);
        if similarity >= config.similarity_threshold {
            info!(
                existing = %existing_title,
                similarity = format!("{similarity:.2}"),
                "Duplicate found"
            );
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassifiedItem;
    use crate::publisher::PublishError;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    struct FixedStore {
        titles: Vec<String>,
    }

    impl PublishStore for FixedStore {
        async fn recent_titles(
            &self,
            _prefix: &str,
            _kind: ContentKind,
            _created_after: DateTime<Utc>,
        ) -> Result<Vec<String>, PublishError> {
            Ok(self.titles.clone())
        }

        async fn publish(&self, _item: &ClassifiedItem) -> Result<String, PublishError> {
            unreachable!("dedupe tests never publish")
        }
    }

    struct DownStore;

    impl PublishStore for DownStore {
        async fn recent_titles(
            &self,
            _prefix: &str,
            _kind: ContentKind,
            _created_after: DateTime<Utc>,
        ) -> Result<Vec<String>, PublishError> {
            Err(PublishError::Status(503))
        }

        async fn publish(&self, _item: &ClassifiedItem) -> Result<String, PublishError> {
            unreachable!("dedupe tests never publish")
        }
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(
            normalize_title("Episodio 42: ¡La CRISIS!").split_whitespace().collect::<Vec<_>>(),
            vec!["episodio", "42", "la", "crisis"]
        );
    }

    #[test]
    fn test_jaccard_identical_titles() {
        assert_eq!(token_jaccard("La crisis del agua", "la crisis del agua"), 1.0);
    }

    #[test]
    fn test_jaccard_known_value() {
        // {a b c} vs {a b c d}: 3 shared of 4 union.
        assert_eq!(token_jaccard("uno dos tres", "uno dos tres cuatro"), 0.75);
    }

    #[test]
    fn test_jaccard_empty_side_is_zero() {
        assert_eq!(token_jaccard("", "uno dos"), 0.0);
        assert_eq!(token_jaccard("¡¡¡", "uno dos"), 0.0);
    }

    #[test]
    fn test_jaccard_punctuation_only_differences_are_identical() {
        // Date/number suffixes survive tokenization; punctuation does not.
        assert_eq!(
            token_jaccard("Episodio 42: La crisis", "Episodio 42 - La crisis"),
            1.0
        );
    }

    #[tokio::test]
    async fn test_exists_similar_at_threshold() {
        // Nine shared tokens of ten union = 0.90, exactly at the default
        // threshold: a duplicate.
        let store = FixedStore {
            titles: vec!["a b c d e f g h i j".to_string()],
        };
        let config = DedupeConfig::default();
        assert!(exists_similar(&store, &config, "a b c d e f g h i", ContentKind::Article).await);
    }

    #[tokio::test]
    async fn test_exists_similar_below_threshold() {
        // Four shared of five union = 0.80: not a duplicate at 0.90.
        let store = FixedStore {
            titles: vec!["Episodio 42 La crisis económica".to_string()],
        };
        let config = DedupeConfig::default();
        assert!(
            !exists_similar(&store, &config, "Episodio 42: La crisis", ContentKind::Podcast).await
        );
    }

    #[tokio::test]
    async fn test_exists_similar_respects_configured_threshold() {
        let store = FixedStore {
            titles: vec!["Episodio 42 La crisis económica".to_string()],
        };
        let config = DedupeConfig {
            similarity_threshold: 0.75,
            ..DedupeConfig::default()
        };
        assert!(
            exists_similar(&store, &config, "Episodio 42: La crisis", ContentKind::Podcast).await
        );
    }

    #[tokio::test]
    async fn test_fails_open_when_store_is_down() {
        let config = DedupeConfig::default();
        assert!(!exists_similar(&DownStore, &config, "cualquier título", ContentKind::Article).await);
    }
}
