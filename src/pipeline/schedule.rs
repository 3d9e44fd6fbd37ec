//! The bounded-concurrency scheduler for correction tasks.
//!
//! Admission control is the stream's buffer: `buffer_unordered(n)` polls at
//! most `n` task futures at once, and the futures are lazy, so a task does no
//! work — and issues no request — until it is admitted to a slot. This bounds
//! API pressure and in-flight memory independent of document length; a
//! 1 000-page document never has more than `concurrency` calls outstanding.
//!
//! Tasks are fully independent (their context windows were frozen before
//! dispatch), so completion order is irrelevant; results are keyed by page
//! number for the assembler.
//!
//! ## Accounting guarantees
//!
//! * Exactly one [`PageResult`] per submitted task, success or failure — the
//!   map is total, never a silent subset.
//! * The completed count increments for failures too, so progress always
//!   reaches 100% of submitted tasks.
//! * Under [`FailurePolicy::AbortOnFirstFailure`], the first terminal failure
//!   flips a flag checked at admission: in-flight calls finish naturally
//!   (no mid-flight interruption of an external request) and every
//!   never-admitted page is recorded as [`PageError::NotAttempted`].

use crate::backend::CompletionBackend;
use crate::config::{FailurePolicy, TranscriptConfig};
use crate::error::PageError;
use crate::output::PageResult;
use crate::pipeline::correct::{correct_page, CorrectionTask};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Run every correction task under the configured concurrency bound.
///
/// Returns one entry per submitted task, keyed by page number.
pub async fn run_corrections(
    tasks: Vec<CorrectionTask>,
    backend: Arc<dyn CompletionBackend>,
    config: &TranscriptConfig,
) -> BTreeMap<usize, PageResult> {
    let total = tasks.len();
    let aborted = Arc::new(AtomicBool::new(false));
    let completed = Arc::new(AtomicUsize::new(0));
    let policy = config.failure_policy;

    let results: Vec<PageResult> = stream::iter(tasks.into_iter().map(|task| {
        let backend = Arc::clone(&backend);
        let aborted = Arc::clone(&aborted);
        let completed = Arc::clone(&completed);
        let config = config.clone();

        async move {
            let page_num = task.page_num;

            let result = if aborted.load(Ordering::SeqCst) {
                PageResult {
                    page_num,
                    text: String::new(),
                    strategy: task.strategy,
                    attempts: 0,
                    duration_ms: 0,
                    error: Some(PageError::NotAttempted { page: page_num }),
                }
            } else {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_start(page_num, total);
                }
                correct_page(&backend, &task, &config).await
            };

            // Completion accounting happens for every outcome, so progress
            // reaches 100% even when pages fail.
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Scheduler: {done}/{total} tasks accounted for");

            match &result.error {
                None => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_complete(page_num, total, result.text.len());
                    }
                }
                Some(e) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_page_error(page_num, total, &e.to_string());
                    }
                    if policy == FailurePolicy::AbortOnFirstFailure
                        && matches!(e, PageError::CorrectionFailed { .. })
                        && !aborted.swap(true, Ordering::SeqCst)
                    {
                        warn!(
                            "Page {page_num} failed terminally; no further pages will be admitted"
                        );
                    }
                }
            }

            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    results.into_iter().map(|r| (r.page_num, r)).collect()
}
