//! The fallback orchestrator: source resolution with duplicate protection.
//!
//! This is the engine's core state machine. For each content type it walks
//! `TRY_PRIMARY → TRY_NEXT_SOURCE → EXHAUSTED`, with `PUBLISHED` and a
//! per-item publish failure as the terminal states, expressed as ordinary
//! control flow over tagged results.
//!
//! # Algorithm
//!
//! 1. Outer loop of up to `max_passes` whole-pipeline passes, shared across
//!    both content types so a failure in one cannot starve retries of the
//!    other.
//! 2. Each pass attempts the day's primary source first. A fetch error, a
//!    gated-out feed, or a duplicate escalates to the alternatives.
//! 3. Alternatives are traversed in catalog order; each may have up to
//!    `entries_per_alternative` entries inspected. The first fresh,
//!    classified candidate wins (first-fit, no scoring).
//! 4. When a pass exhausts every alternative, the orchestrator pauses
//!    briefly and restarts. Later passes select with an offset
//!    (alternative-search mode) and the (source, candidate) bookkeeping
//!    guarantees no pair is ever inspected twice in one run, so revisited
//!    sources surface different entries.
//! 5. After the final pass the run reports `Exhausted`, an explicit
//!    outcome, never an infinite loop.
//!
//! Publisher failure on an accepted item is a per-item hard stop: the
//! duplicate cascade is about content, not about transient publish errors.

use crate::catalog;
use crate::classify::ClassifyContent;
use crate::config::Config;
use crate::dedupe;
use crate::feeds::{FetchFeed, SelectionMode};
use crate::models::{
    AttemptOutcome, AttemptRecord, ContentKind, RunOutcome, Source,
};
use crate::publisher::PublishStore;
use crate::schedule::DayPlan;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Result of one full resolution run across both content types.
#[derive(Debug)]
pub struct CascadeReport {
    pub article: RunOutcome,
    pub podcast: RunOutcome,
    /// Every (source, candidate) inspection, in order.
    pub attempts: Vec<AttemptRecord>,
    /// Outer passes actually executed.
    pub passes_used: u32,
}

/// Outcome of trying one source within a pass.
enum TryResult {
    Published(String),
    PublishFailed(String),
    /// Nothing usable here; escalate to the next source.
    NoAcceptable,
}

/// The coordinating state machine.
///
/// Generic over its three collaborator seams so tests can drive the
/// cascade with canned feeds, a fixed classifier, and an in-memory store.
pub struct Orchestrator<'a, F, C, S> {
    fetcher: &'a F,
    classifier: &'a C,
    store: &'a S,
    config: &'a Config,
    rng: StdRng,
    /// (source id, feed index) pairs inspected so far this run.
    tried: HashSet<(&'static str, usize)>,
    attempts: Vec<AttemptRecord>,
}

impl<'a, F, C, S> Orchestrator<'a, F, C, S>
where
    F: FetchFeed,
    C: ClassifyContent,
    S: PublishStore,
{
    pub fn new(fetcher: &'a F, classifier: &'a C, store: &'a S, config: &'a Config) -> Self {
        Self::with_seed(fetcher, classifier, store, config, rand::rng().random())
    }

    /// Seeded constructor: the alternate-search offset is the only
    /// randomness in the engine, so a fixed seed makes runs reproducible
    /// in tests.
    pub fn with_seed(
        fetcher: &'a F,
        classifier: &'a C,
        store: &'a S,
        config: &'a Config,
        seed: u64,
    ) -> Self {
        Self {
            fetcher,
            classifier,
            store,
            config,
            rng: StdRng::seed_from_u64(seed),
            tried: HashSet::new(),
            attempts: Vec::new(),
        }
    }

    /// Run the cascade for both content types of the day's plan.
    #[instrument(level = "info", skip_all, fields(date = %plan.date))]
    pub async fn run(mut self, plan: &DayPlan) -> CascadeReport {
        let max_passes = self.config.cascade.max_passes;
        let mut article = RunOutcome::Exhausted;
        let mut podcast = RunOutcome::Exhausted;
        let mut passes_used = 0;

        for pass in 1..=max_passes {
            passes_used = pass;
            info!(pass, max_passes, "Starting resolution pass");

            if !article.is_settled() {
                article = self
                    .resolve(ContentKind::Article, plan.article_source, pass)
                    .await;
            }
            if !podcast.is_settled() {
                podcast = self
                    .resolve(ContentKind::Podcast, plan.podcast_source, pass)
                    .await;
            }

            if article.is_settled() && podcast.is_settled() {
                break;
            }
            if pass < max_passes {
                let pause = Duration::from_secs(self.config.cascade.pass_pause_secs);
                info!(?pause, "Pass exhausted; pausing before retry");
                sleep(pause).await;
            }
        }

        for attempt in &self.attempts {
            debug!(
                source = attempt.source_id,
                index = attempt.candidate_index,
                outcome = ?attempt.outcome,
                "Run attempt"
            );
        }

        CascadeReport {
            article,
            podcast,
            attempts: self.attempts,
            passes_used,
        }
    }

    /// One pass of the cascade for one content type.
    #[instrument(level = "info", skip(self, primary), fields(primary = primary.id))]
    async fn resolve(
        &mut self,
        kind: ContentKind,
        primary: &'static Source,
        pass: u32,
    ) -> RunOutcome {
        // TRY_PRIMARY: the first pass takes the feed's top entry; later
        // passes offset into the feed so the entry that failed before is
        // not re-surfaced.
        let mode = self.selection_mode(pass);
        match self.try_source(primary, mode, 1).await {
            TryResult::Published(url) => return RunOutcome::Published(url),
            TryResult::PublishFailed(reason) => return RunOutcome::Failed(reason),
            TryResult::NoAcceptable => {
                info!(source = primary.id, "Primary yielded nothing; escalating to alternatives");
            }
        }

        // TRY_NEXT_SOURCE: catalog order, current source excluded,
        // first-fit wins.
        for alternative in catalog::alternatives(kind, primary.id) {
            info!(
                source = alternative.id,
                rank = alternative.priority_rank,
                "Trying alternative source"
            );
            let mode = self.selection_mode(pass);
            let window = self.config.cascade.entries_per_alternative;
            match self.try_source(alternative, mode, window).await {
                TryResult::Published(url) => return RunOutcome::Published(url),
                TryResult::PublishFailed(reason) => return RunOutcome::Failed(reason),
                TryResult::NoAcceptable => continue,
            }
        }

        info!(%kind, pass, "All alternatives exhausted for this pass");
        RunOutcome::Exhausted
    }

    /// Inspect one source: fetch its feed, then duplicate-check candidates
    /// within the selection window until one is accepted or the window is
    /// spent.
    async fn try_source(
        &mut self,
        source: &'static Source,
        mode: SelectionMode,
        window: usize,
    ) -> TryResult {
        let doc = match self.fetcher.fetch(source).await {
            Ok(doc) => doc,
            Err(e) => {
                // Transient source errors recover locally by escalation.
                warn!(source = source.id, error = %e, "Feed fetch failed; skipping source");
                return TryResult::NoAcceptable;
            }
        };

        loop {
            let candidate = crate::feeds::resolver::select_candidate(&doc, mode, window, |i| {
                self.tried.contains(&(source.id, i))
            });
            let Some(candidate) = candidate else {
                return TryResult::NoAcceptable;
            };

            self.tried.insert((source.id, candidate.feed_index));
            let index = candidate.feed_index;
            let kind = candidate.content_type;

            let item = self.classifier.classify(candidate).await;

            if dedupe::exists_similar(self.store, &self.config.dedupe, &item.candidate.title, kind)
                .await
            {
                info!(
                    source = source.id,
                    index,
                    title = %item.candidate.title,
                    "Candidate is a near-duplicate; trying next"
                );
                self.attempts.push(AttemptRecord {
                    source_id: source.id,
                    candidate_index: index,
                    outcome: AttemptOutcome::Duplicate,
                });
                continue;
            }

            self.attempts.push(AttemptRecord {
                source_id: source.id,
                candidate_index: index,
                outcome: AttemptOutcome::Accepted,
            });

            return match self.store.publish(&item).await {
                Ok(url) => {
                    info!(source = source.id, %url, title = %item.candidate.title, "Published");
                    TryResult::Published(url)
                }
                Err(e) => {
                    // Per-item hard stop: publish-call errors are not a
                    // reason to re-enter the duplicate cascade.
                    error!(source = source.id, error = %e, "Publish failed for accepted item");
                    TryResult::PublishFailed(e.to_string())
                }
            };
        }
    }

    fn selection_mode(&mut self, pass: u32) -> SelectionMode {
        if pass == 1 {
            SelectionMode::Primary
        } else {
            SelectionMode::Alternate {
                offset: self.rng.random_range(1..=3),
            }
        }
    }
}
