//! # Español Diario
//!
//! A daily curation pipeline that selects one Spanish-learning article and
//! one podcast episode from a fixed catalog of feeds, classifies them with
//! an external analyzer, and publishes them to a page database, while
//! guaranteeing no near-duplicate item is published twice.
//!
//! ## Usage
//!
//! ```sh
//! espanol_diario -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! The engine is a sequential pipeline driven by a fallback state machine:
//! 1. **Schedule**: the date picks the day's primary sources
//! 2. **Resolution**: the orchestrator fetches feeds, selects candidates,
//!    classifies them, and duplicate-checks against recently published
//!    titles, cascading across alternative sources until a fresh item is
//!    found or the attempt budget is exhausted
//! 3. **Publication**: accepted items become pages in the destination store
//!
//! ## Exit status
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | both items published |
//! | 1 | internal error (bad config, store rejected an item) |
//! | 2 | cascade exhausted for at least one content type |
//!
//! A wrapping scheduler uses the status to decide whether to alert a human
//! or silently skip the day.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod analyzer;
mod catalog;
mod classify;
mod cli;
mod config;
mod dedupe;
mod extract;
mod feeds;
mod links;
mod models;
mod orchestrator;
mod publisher;
mod schedule;
mod utils;

use analyzer::{HttpAnalyzer, RetryAnalyze};
use classify::HttpClassifier;
use cli::Cli;
use config::Config;
use feeds::HttpFeedFetcher;
use models::RunOutcome;
use orchestrator::{CascadeReport, Orchestrator};
use publisher::NotionStore;

const EXIT_PUBLISHED: i32 = 0;
const EXIT_INTERNAL_ERROR: i32 = 1;
const EXIT_EXHAUSTED: i32 = 2;

#[tokio::main]
async fn main() {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("espanol_diario starting up");

    let code = match execute().await {
        Ok(report) => {
            let code = exit_code_for(&report);
            let elapsed = start_time.elapsed();
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                passes = report.passes_used,
                attempts = report.attempts.len(),
                exit_code = code,
                "Execution complete"
            );
            code
        }
        Err(e) => {
            error!(error = %e, "Run aborted by internal error");
            EXIT_INTERNAL_ERROR
        }
    };
    std::process::exit(code);
}

async fn execute() -> Result<CascadeReport, Box<dyn Error>> {
    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(key) = args.analyzer_api_key {
        config.analyzer.api_key = Some(key);
    }
    if let Some(token) = args.store_token {
        config.store.token = Some(token);
    }
    if let Some(database_id) = args.store_database_id {
        config.store.database_id = Some(database_id);
    }

    // The destination store is the point of the run; refuse to start
    // without it. The analyzer is optional: classification degrades.
    let store_token = config
        .store
        .token
        .clone()
        .ok_or("store token not configured (set --store-token or STORE_TOKEN)")?;
    let database_id = config
        .store
        .database_id
        .clone()
        .ok_or("store database id not configured (set --store-database-id or STORE_DATABASE_ID)")?;

    let analyzer_key = match config.analyzer.api_key.clone() {
        Some(key) => key,
        None => {
            warn!("No analyzer API key; classification will degrade to defaults");
            String::new()
        }
    };

    let client = reqwest::Client::builder()
        .user_agent(config.http.user_agent.clone())
        .build()?;
    let timeout = config.request_timeout();

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let plan = schedule::plan_for(date);
    info!(
        date = %plan.date,
        week = plan.week_number,
        article_source = plan.article_source.id,
        podcast_source = plan.podcast_source.id,
        "Day plan computed"
    );

    let fetcher = HttpFeedFetcher::new(client.clone(), timeout);
    let analyzer = RetryAnalyze::new(
        HttpAnalyzer::new(client.clone(), &config.analyzer, analyzer_key, timeout),
        config.analyzer.max_retries,
        std::time::Duration::from_secs(1),
    );
    let classifier = HttpClassifier::new(client.clone(), analyzer, timeout);
    let store = NotionStore::new(
        client,
        config.store.api_base.clone(),
        store_token,
        database_id,
        timeout,
    );

    let report = Orchestrator::new(&fetcher, &classifier, &store, &config)
        .run(&plan)
        .await;

    log_outcome("article", &report.article);
    log_outcome("podcast", &report.podcast);
    Ok(report)
}

fn log_outcome(kind: &str, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Published(url) => info!(kind, %url, "Material published"),
        RunOutcome::Exhausted => warn!(kind, "No fresh material found; cascade exhausted"),
        RunOutcome::Failed(reason) => error!(kind, %reason, "Publish failed for accepted item"),
    }
}

/// Map the run's outcomes onto the documented exit codes. Failure
/// dominates exhaustion: a scheduler should treat a rejected publish as
/// worth a look, not as an empty day.
fn exit_code_for(report: &CascadeReport) -> i32 {
    let outcomes = [&report.article, &report.podcast];
    if outcomes.iter().any(|o| matches!(o, RunOutcome::Failed(_))) {
        EXIT_INTERNAL_ERROR
    } else if outcomes.iter().any(|o| matches!(o, RunOutcome::Exhausted)) {
        EXIT_EXHAUSTED
    } else {
        EXIT_PUBLISHED
    }
}
