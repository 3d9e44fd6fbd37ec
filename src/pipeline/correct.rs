//! The retrying correction unit: one page in, one terminal outcome out.
//!
//! This module knows nothing about concurrency limits or ordering — it is a
//! pure request/retry unit, composable with any scheduler. All prompt text
//! lives in [`crate::prompts`] so it can change without touching retry logic.
//!
//! ## Retry strategy
//!
//! Rate limits and 5xx errors are frequent under concurrent load and almost
//! always transient. Every failure is retried up to `max_retries` total
//! attempts with exponential backoff plus uniform jitter
//! (`base * 2^(attempt-1) + uniform(0, jitter)`); the jitter desynchronises
//! many concurrently failing tasks so a recovering endpoint is not stampeded.
//! Exhaustion is a terminal, attributed failure — never a silent substitution
//! of raw text for cleaned text.

use crate::backend::CompletionBackend;
use crate::config::TranscriptConfig;
use crate::error::PageError;
use crate::output::{ExtractionStrategy, PageResult};
use crate::prompts::{correction_user_message, CORRECTION_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// One page's unit of correction work, with its context frozen at creation.
///
/// The prev/next snapshots are cloned from the materialised raw-text sequence
/// before any task is dispatched, so a task's context can never change based
/// on the processing order of other pages.
#[derive(Debug, Clone)]
pub struct CorrectionTask {
    /// 1-based page number.
    pub page_num: usize,
    /// The page's raw text (possibly empty).
    pub current: String,
    /// Raw text of the previous page, empty at the document start.
    pub prev: String,
    /// Raw text of the next page, empty at the document end.
    pub next: String,
    /// How the raw text was obtained; carried through to the result.
    pub strategy: ExtractionStrategy,
}

/// Backoff wait before the attempt following `attempt` (1-based).
///
/// Pure so tests can verify the schedule without sleeping.
pub fn backoff_delay(base_ms: u64, jitter_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let jitter = if jitter_ms > 0 {
        fastrand::u64(0..=jitter_ms)
    } else {
        0
    };
    Duration::from_millis(exp.saturating_add(jitter))
}

/// Correct a single page, retrying transient failures.
///
/// Always returns a `PageResult` — never propagates the error upward, so a
/// single bad page cannot abort its siblings. Callers check `result.error`.
///
/// An empty raw text short-circuits to an empty success with zero attempts:
/// there is nothing to correct and no request is issued.
pub async fn correct_page(
    backend: &Arc<dyn CompletionBackend>,
    task: &CorrectionTask,
    config: &TranscriptConfig,
) -> PageResult {
    let start = Instant::now();

    if task.current.trim().is_empty() {
        debug!("Page {}: empty raw text, correction is a no-op", task.page_num);
        return PageResult {
            page_num: task.page_num,
            text: String::new(),
            strategy: task.strategy,
            attempts: 0,
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        };
    }

    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(CORRECTION_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(correction_user_message(
            &task.current,
            &task.prev,
            &task.next,
        )),
    ];

    let options = build_options(config);

    let mut last_err: Option<String> = None;

    for attempt in 1..=config.max_retries {
        if attempt > 1 {
            let backoff = backoff_delay(
                config.retry_base_delay_ms,
                config.retry_jitter_ms,
                attempt - 1,
            );
            warn!(
                "Page {}: retry {}/{} after {}ms",
                task.page_num,
                attempt,
                config.max_retries,
                backoff.as_millis()
            );
            sleep(backoff).await;
        }

        match backend.complete(&messages, &options).await {
            Ok(text) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: corrected in {:?} ({} attempts)",
                    task.page_num, duration, attempt
                );
                return PageResult {
                    page_num: task.page_num,
                    text: text.trim().to_string(),
                    strategy: task.strategy,
                    attempts: attempt,
                    duration_ms: duration.as_millis() as u64,
                    error: None,
                };
            }
            Err(e) => {
                warn!(
                    "Page {}: attempt {}/{} failed — {}",
                    task.page_num, attempt, config.max_retries, e
                );
                last_err = Some(e.to_string());
            }
        }
    }

    // Retries exhausted: a terminal, attributed failure.
    let duration = start.elapsed();
    let detail = last_err.unwrap_or_else(|| "unknown error".to_string());

    PageResult {
        page_num: task.page_num,
        text: String::new(),
        strategy: task.strategy,
        attempts: config.max_retries,
        duration_ms: duration.as_millis() as u64,
        error: Some(PageError::CorrectionFailed {
            page: task.page_num,
            attempts: config.max_retries,
            detail,
        }),
    }
}

fn build_options(config: &TranscriptConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    }
}
