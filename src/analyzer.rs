//! External text analyzer with exponential backoff retry logic.
//!
//! The analyzer is a black-box collaborator: an OpenAI-compatible chat
//! completions endpoint that grades difficulty and extracts grammar
//! structures, colloquial expressions, and learning goals from Spanish
//! text. Every caller of this module holds a default fallback value;
//! analyzer failure degrades classification but never aborts a resolution
//! run.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`Analyze`]: core trait defining one completion call
//! - [`HttpAnalyzer`]: production implementation over `reqwest`
//! - [`RetryAnalyze`]: decorator that adds retry logic to any `Analyze`
//!   implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::AnalyzerConfig;
use crate::models::Tier;
use crate::utils::truncate_for_log;
use rand::{rng, Rng};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Trait for one analyzer completion call.
///
/// Implementors send a prompt to the analyzer and return its raw text
/// response. This abstraction allows decorators (like retry logic) and
/// deterministic fakes in tests.
#[allow(async_fn_in_trait)]
pub trait Analyze {
    /// Send a prompt and receive the raw response text.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, Box<dyn Error>>;
}

/// Production analyzer client over an OpenAI-compatible chat endpoint.
///
/// The request/response contract is the standard chat completions shape;
/// only the first choice's message content is used.
#[derive(Clone)]
pub struct HttpAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: StdDuration,
}

impl fmt::Debug for HttpAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAnalyzer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are an expert Spanish language teacher and \
linguist specializing in analyzing Spanish content for language learners.";

impl HttpAnalyzer {
    pub fn new(
        client: reqwest::Client,
        config: &AnalyzerConfig,
        api_key: String,
        timeout: StdDuration,
    ) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout,
        }
    }
}

impl Analyze for HttpAnalyzer {
    #[instrument(level = "info", skip_all)]
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": max_tokens,
            "temperature": 0.3,
            "top_p": 0.9,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or("analyzer returned no choices")?;

        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            response_preview = %truncate_for_log(&content, 120),
            "Analyzer call succeeded"
        );
        Ok(content)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Analyze`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAnalyze<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAnalyze<T>
where
    T: Analyze,
{
    /// Wrap an analyzer with retry logic.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAnalyze<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAnalyze")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Analyze for RetryAnalyze<T>
where
    T: Analyze,
{
    #[instrument(level = "info", skip_all)]
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.complete(prompt, max_tokens).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "complete() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "complete() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Sentinel the prompt asks the analyzer to emit when the text genuinely
/// contains no colloquial expressions. Its presence means "nothing found",
/// a valid outcome distinct from a failed call.
const NO_EXPRESSIONS_SENTINEL: &str = "NO_COLLOQUIAL_EXPRESSIONS_FOUND";

/// Grade the CEFR difficulty of a Spanish text.
///
/// Sends up to the first 1000 characters; any failure or unrecognizable
/// response is an `Err` the caller replaces with [`Tier::DEFAULT`].
#[instrument(level = "info", skip_all)]
pub async fn analyze_difficulty<A: Analyze>(
    analyzer: &A,
    text: &str,
) -> Result<Tier, Box<dyn Error>> {
    let excerpt = clip(text, 1000);
    let prompt = format!(
        "Analyze this Spanish text and determine its CEFR difficulty level \
         (A1, A2, B1, B1+, B2, B2+, C1, C2).\n\n\
         Consider vocabulary complexity, grammar structures, sentence length, \
         and abstract vs concrete concepts.\n\n\
         Text:\n{excerpt}\n\n\
         Respond with only the CEFR level, no additional text."
    );
    let response = analyzer.complete(&prompt, 50).await?;
    Tier::parse(&response).ok_or_else(|| {
        format!(
            "analyzer returned no recognizable tier: {}",
            truncate_for_log(&response, 80)
        )
        .into()
    })
}

/// Extract 3-4 grammar structures worth studying at the given tier.
///
/// Each returned line is one study point. An empty list from a successful
/// call means the response carried no parseable points.
#[instrument(level = "info", skip_all)]
pub async fn analyze_grammar<A: Analyze>(
    analyzer: &A,
    text: &str,
    tier: Tier,
) -> Result<Vec<String>, Box<dyn Error>> {
    let excerpt = clip(text, 1500);
    let prompt = format!(
        "Analyze this Spanish article and identify 3-4 grammar structures \
         suitable for {tier} level learners.\n\n\
         Article:\n{excerpt}\n\n\
         Return one point per line in exactly this format, no additional text:\n\
         - <structure name> (<CEFR level>): \"<exact sentence from the text>\""
    );
    let response = analyzer.complete(&prompt, 600).await?;
    Ok(parse_dashed_lines(&response, 4))
}

/// Extract colloquial expressions actually present in a transcript.
///
/// The prompt instructs the analyzer to answer with a fixed sentinel when
/// the text is formal and contains none; that case returns an empty list,
/// which is a valid outcome, not an error.
#[instrument(level = "info", skip_all)]
pub async fn analyze_colloquialisms<A: Analyze>(
    analyzer: &A,
    text: &str,
    tier: Tier,
) -> Result<Vec<String>, Box<dyn Error>> {
    let excerpt = clip(text, 2000);
    let prompt = format!(
        "You are analyzing Spanish text to find colloquial expressions that \
         ACTUALLY APPEAR in the text. Do not invent expressions.\n\n\
         Text:\n{excerpt}\n\n\
         Target learner level: {tier}.\n\
         If the text is formal and contains no colloquial expressions, \
         respond with exactly: {NO_EXPRESSIONS_SENTINEL}\n\
         Otherwise return one expression per line in exactly this format:\n\
         - \"<expression>\" → <short meaning>"
    );
    let response = analyzer.complete(&prompt, 400).await?;
    if response.contains(NO_EXPRESSIONS_SENTINEL) {
        info!("Analyzer found no colloquial expressions (valid outcome)");
        return Ok(Vec::new());
    }
    Ok(parse_expression_lines(&response, 5))
}

/// Suggest study goals for the item.
#[instrument(level = "info", skip_all)]
pub async fn analyze_learning_goals<A: Analyze>(
    analyzer: &A,
    text: &str,
    title: &str,
    tier: Tier,
    expression_count: usize,
) -> Result<Vec<String>, Box<dyn Error>> {
    let excerpt = clip(text, 1000);
    let prompt = format!(
        "A {tier}-level Spanish learner will study the item titled \
         \"{title}\". The analysis found {expression_count} colloquial \
         expression(s).\n\n\
         Excerpt:\n{excerpt}\n\n\
         Suggest up to 3 concrete study goals, one per line, each starting \
         with \"- \". No additional text."
    );
    let response = analyzer.complete(&prompt, 200).await?;
    Ok(parse_dashed_lines(&response, 3))
}

/// Collect up to `max` lines of the form `- <content>`.
fn parse_dashed_lines(response: &str, max: usize) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| line.trim().strip_prefix("- ").map(str::trim))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .take(max)
        .collect()
}

/// Parse `- "expression" → meaning` lines into `expression (meaning)`.
fn parse_expression_lines(response: &str, max: usize) -> Vec<String> {
    let mut expressions = Vec::new();
    for line in response.lines() {
        let line = line.trim();
        if !line.starts_with('-') || !line.contains('"') || !line.contains('→') {
            continue;
        }
        let Some(start) = line.find('"') else { continue };
        let Some(rel_end) = line[start + 1..].find('"') else {
            continue;
        };
        let expression = &line[start + 1..start + 1 + rel_end];
        let rest = &line[start + 1 + rel_end + 1..];
        let Some(meaning_raw) = rest.split('→').nth(1) else {
            continue;
        };
        // Drop a trailing "(usage context)" clarifier if present.
        let meaning = meaning_raw
            .split('(')
            .next()
            .unwrap_or(meaning_raw)
            .trim();
        if expression.is_empty() || meaning.is_empty() {
            continue;
        }
        expressions.push(format!("{expression} ({meaning})"));
        if expressions.len() == max {
            break;
        }
    }
    expressions
}

/// Clip text to at most `max` characters, appending an ellipsis when cut,
/// to bound analyzer cost on long transcripts.
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let clipped: String = text.chars().take(max).collect();
        format!("{clipped}...")
    }
}
