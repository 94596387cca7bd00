//! Data models for curated learning material and resolution outcomes.
//!
//! This module defines the core data structures used throughout the engine:
//! - [`Source`]: a static catalog entry (reading feed or podcast feed)
//! - [`CandidateItem`]: an unclassified feed entry eligible for publication
//! - [`ClassifiedItem`]: a candidate enriched with difficulty, topic, and
//!   analyzer annotations
//! - [`Analysis`]: the annotation set produced by the external analyzer
//! - [`AttemptRecord`]: per-run bookkeeping of which (source, candidate)
//!   pairs the orchestrator has already inspected
//! - [`RunOutcome`]: the tagged terminal result of a resolution run
//!
//! Candidates are constructed immediately after feed parsing so downstream
//! components never depend on the feed parser's native entry shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of learning material the engine curates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A newspaper article from a reading source.
    Article,
    /// A podcast episode.
    Podcast,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Article => write!(f, "article"),
            ContentKind::Podcast => write!(f, "podcast"),
        }
    }
}

/// A content source from the static catalog.
///
/// Sources are immutable and defined at process start; identity is the `id`.
/// `priority_rank` mirrors declaration order within a kind and is the
/// tie-break used by the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    /// Stable identifier, e.g. `"elpais-portada"`.
    pub id: &'static str,
    /// Human-readable name, e.g. `"El País"`.
    pub name: &'static str,
    /// Whether this source provides articles or podcast episodes.
    pub kind: ContentKind,
    /// 1-based position within the catalog for this kind.
    pub priority_rank: u8,
    /// The RSS/Atom endpoint to fetch.
    pub feed_endpoint: &'static str,
    /// Region the content originates from, e.g. `"España"`.
    pub region: &'static str,
    /// Listener/reader-facing link used when entry links cannot be resolved.
    pub base_link_template: &'static str,
}

/// An unclassified feed entry selected for possible publication.
///
/// Built at the parse boundary from a [`crate::feeds::FeedEntry`]; consumed
/// by the classifier and the duplicate guard; discarded on rejection.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    /// Entry title as published by the feed.
    pub title: String,
    /// Entry link as published by the feed (may be dead or feed-internal).
    pub raw_link: String,
    /// Publication timestamp, when the feed provided a parseable one.
    pub published_at: Option<DateTime<Utc>>,
    /// Entry summary/description, when present.
    pub summary: Option<String>,
    /// Content type of the source this candidate came from.
    pub content_type: ContentKind,
    /// Catalog id of the source this candidate came from.
    pub source_id: &'static str,
    /// Index of the entry within its feed at selection time.
    pub feed_index: usize,
    /// Raw `itunes:duration` value for podcast entries, when present.
    pub itunes_duration: Option<String>,
}

/// CEFR difficulty tier used to grade learning material.
///
/// The plus variants (`B1+`, `B2+`) follow the analyzer's grading scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    A1,
    A2,
    B1,
    B1Plus,
    B2,
    B2Plus,
    C1,
    C2,
}

impl Tier {
    /// Default tier used whenever the analyzer is unavailable or the text
    /// is empty.
    pub const DEFAULT: Tier = Tier::B2;

    /// Parse a tier from analyzer output. Plus variants are matched before
    /// their base tier so `"B2+"` does not collapse to `B2`.
    pub fn parse(s: &str) -> Option<Tier> {
        let upper = s.to_uppercase();
        const ORDERED: [(&str, Tier); 8] = [
            ("B1+", Tier::B1Plus),
            ("B2+", Tier::B2Plus),
            ("A1", Tier::A1),
            ("A2", Tier::A2),
            ("B1", Tier::B1),
            ("B2", Tier::B2),
            ("C1", Tier::C1),
            ("C2", Tier::C2),
        ];
        ORDERED
            .iter()
            .find(|(label, _)| upper.contains(label))
            .map(|(_, tier)| *tier)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::A1 => "A1",
            Tier::A2 => "A2",
            Tier::B1 => "B1",
            Tier::B1Plus => "B1+",
            Tier::B2 => "B2",
            Tier::B2Plus => "B2+",
            Tier::C1 => "C1",
            Tier::C2 => "C2",
        };
        write!(f, "{s}")
    }
}

/// Topic tag from the fixed classification taxonomy.
///
/// Registration order (the order of `Topic::ALL`) is the tie-break when
/// keyword scores are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Politics,
    Economy,
    Society,
    Sports,
    Technology,
    Culture,
    International,
    Health,
    Education,
    Food,
    Travel,
    Grammar,
    Family,
    Work,
    /// Fallback when no taxonomy keyword matches.
    General,
}

impl Topic {
    /// All scored topics, in registration (tie-break) order. `General` is
    /// the no-match fallback and is deliberately absent.
    pub const ALL: [Topic; 14] = [
        Topic::Politics,
        Topic::Economy,
        Topic::Society,
        Topic::Sports,
        Topic::Technology,
        Topic::Culture,
        Topic::International,
        Topic::Health,
        Topic::Education,
        Topic::Food,
        Topic::Travel,
        Topic::Grammar,
        Topic::Family,
        Topic::Work,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Topic::Politics => "politics",
            Topic::Economy => "economy",
            Topic::Society => "society",
            Topic::Sports => "sports",
            Topic::Technology => "technology",
            Topic::Culture => "culture",
            Topic::International => "international",
            Topic::Health => "health",
            Topic::Education => "education",
            Topic::Food => "food",
            Topic::Travel => "travel",
            Topic::Grammar => "grammar",
            Topic::Family => "family",
            Topic::Work => "work",
            Topic::General => "general",
        };
        write!(f, "{s}")
    }
}

/// Annotations produced by the external analyzer.
///
/// Every field may legitimately be empty: not every source text contains
/// teachable colloquialisms. An empty set is a valid outcome, distinct from
/// analyzer failure (which also degrades to empty but is logged by the
/// caller).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    /// Grammar structures worth studying, one description per entry.
    pub grammar_points: Vec<String>,
    /// Colloquial expressions found in the text, as `expression (meaning)`.
    pub colloquialisms: Vec<String>,
    /// Suggested study goals for the item.
    pub learning_goals: Vec<String>,
}

impl Analysis {
    /// True when the analyzer produced nothing at all.
    pub fn is_empty(&self) -> bool {
        self.grammar_points.is_empty()
            && self.colloquialisms.is_empty()
            && self.learning_goals.is_empty()
    }
}

/// A candidate enriched with classification results, ready for the
/// duplicate check and, if fresh, for publication.
#[derive(Debug, Clone)]
pub struct ClassifiedItem {
    /// The underlying candidate.
    pub candidate: CandidateItem,
    /// Graded difficulty, defaulting to [`Tier::DEFAULT`] on degradation.
    pub difficulty: Tier,
    /// Topic tag from the fixed taxonomy.
    pub topic: Topic,
    /// Playback duration for podcast episodes, e.g. `"23:41"` or `"15-25 min"`.
    pub duration: Option<String>,
    /// Episode number extracted from the title, when present.
    pub episode_number: Option<String>,
    /// Listener/reader-facing link after resolution; falls back to the
    /// source base link when nothing better validates.
    pub resolved_link: String,
    /// Analyzer annotations; may be empty.
    pub analysis: Analysis,
}

/// Outcome of inspecting one (source, candidate) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The source yielded no usable candidate at this index (fetch error,
    /// empty feed, or a candidate rejected by the recency/language gates).
    NoCandidate,
    /// The candidate was a near-duplicate of recently published material.
    Duplicate,
    /// The candidate was accepted and handed to the publisher.
    Accepted,
}

/// Ephemeral record of one inspection during a resolution run.
///
/// The orchestrator keeps these to guarantee it never retries the exact
/// same (source, candidate) pair twice within one run.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub source_id: &'static str,
    pub candidate_index: usize,
    pub outcome: AttemptOutcome,
}

/// Terminal result of a resolution run for one content type.
///
/// Callers pattern-match on this; no sentinel strings are mixed with real
/// URLs anywhere in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// An item was accepted and published; carries the destination page URL.
    Published(String),
    /// Every pass of the cascade was exhausted without a fresh item.
    Exhausted,
    /// The publisher rejected an accepted item. Per-item hard stop: logged,
    /// not retried within the run.
    Failed(String),
}

impl RunOutcome {
    /// Whether this outcome ends the cascade for its content type.
    pub fn is_settled(&self) -> bool {
        !matches!(self, RunOutcome::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_parse_plain_levels() {
        assert_eq!(Tier::parse("B2"), Some(Tier::B2));
        assert_eq!(Tier::parse("c1"), Some(Tier::C1));
        assert_eq!(Tier::parse("The level is A2."), Some(Tier::A2));
    }

    #[test]
    fn test_tier_parse_plus_before_base() {
        assert_eq!(Tier::parse("B2+"), Some(Tier::B2Plus));
        assert_eq!(Tier::parse("b1+"), Some(Tier::B1Plus));
    }

    #[test]
    fn test_tier_parse_garbage() {
        assert_eq!(Tier::parse("intermediate-ish"), None);
        assert_eq!(Tier::parse(""), None);
    }

    #[test]
    fn test_tier_display_roundtrip() {
        for tier in [Tier::A1, Tier::B1Plus, Tier::B2Plus, Tier::C2] {
            assert_eq!(Tier::parse(&tier.to_string()), Some(tier));
        }
    }

    #[test]
    fn test_content_kind_display() {
        assert_eq!(ContentKind::Article.to_string(), "article");
        assert_eq!(ContentKind::Podcast.to_string(), "podcast");
    }

    #[test]
    fn test_analysis_empty_is_valid() {
        let analysis = Analysis::default();
        assert!(analysis.is_empty());

        let with_points = Analysis {
            grammar_points: vec!["subjuntivo presente".to_string()],
            ..Analysis::default()
        };
        assert!(!with_points.is_empty());
    }

    #[test]
    fn test_run_outcome_settled() {
        assert!(RunOutcome::Published("https://example.com/p/1".to_string()).is_settled());
        assert!(RunOutcome::Failed("store returned 500".to_string()).is_settled());
        assert!(!RunOutcome::Exhausted.is_settled());
    }

    #[test]
    fn test_topic_taxonomy_order_starts_with_politics() {
        // Registration order is the documented tie-break.
        assert_eq!(Topic::ALL[0], Topic::Politics);
        assert_eq!(Topic::ALL[1], Topic::Economy);
    }
}
