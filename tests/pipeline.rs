//! Pipeline integration tests with a fake completion backend.
//!
//! Everything here runs without a network, an API key, a pdfium library, or
//! Tesseract: the correction/scheduling/assembly stages are exercised through
//! injected [`CompletionBackend`] fakes. Retry delays are set to 1 ms with no
//! jitter so retry scenarios finish instantly.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions};
use pdf2transcript::pipeline::assemble::assemble;
use pdf2transcript::pipeline::correct::{correct_page, CorrectionTask};
use pdf2transcript::pipeline::schedule::run_corrections;
use pdf2transcript::{
    CompletionBackend, CompletionError, ExtractionStrategy, FailurePolicy, PageError,
    TranscriptConfig, TranscriptProgressCallback,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> TranscriptConfig {
    TranscriptConfig::builder()
        .retry_base_delay_ms(1)
        .retry_jitter_ms(0)
        .build()
        .unwrap()
}

fn task(page_num: usize, text: &str) -> CorrectionTask {
    CorrectionTask {
        page_num,
        current: text.to_string(),
        prev: String::new(),
        next: String::new(),
        strategy: ExtractionStrategy::EmbeddedText,
    }
}

/// Succeeds on every call with fixed text.
struct AlwaysOk;

#[async_trait]
impl CompletionBackend for AlwaysOk {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        Ok("texto corregido".to_string())
    }
}

/// Fails on every call.
struct AlwaysFail;

#[async_trait]
impl CompletionBackend for AlwaysFail {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        Err(CompletionError("429 too many requests".to_string()))
    }
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyBackend {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyBackend {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for FlakyBackend {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(CompletionError("transient timeout".to_string()))
        } else {
            Ok("recuperado".to_string())
        }
    }
}

/// Tracks how many calls are in flight simultaneously.
struct ConcurrencyProbe {
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
}

impl ConcurrencyProbe {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionBackend for ConcurrencyProbe {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("ok".to_string())
    }
}

// ── Retry behaviour ──────────────────────────────────────────────────────

#[tokio::test]
async fn transient_failures_are_retried_to_success() {
    let backend = Arc::new(FlakyBackend::new(2));
    let config = fast_config();

    let result = correct_page(
        &(backend.clone() as Arc<dyn CompletionBackend>),
        &task(1, "pagina uno"),
        &config,
    )
    .await;

    assert!(result.error.is_none());
    assert_eq!(result.text, "recuperado");
    assert_eq!(result.attempts, 3, "two failures then one success");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_are_a_terminal_attributed_failure() {
    let backend: Arc<dyn CompletionBackend> = Arc::new(AlwaysFail);
    let config = fast_config();

    let result = correct_page(&backend, &task(4, "pagina cuatro"), &config).await;

    assert!(result.text.is_empty(), "raw text is never silently substituted");
    assert_eq!(result.attempts, 5);
    match result.error {
        Some(PageError::CorrectionFailed { page, attempts, ref detail }) => {
            assert_eq!(page, 4);
            assert_eq!(attempts, 5);
            assert!(detail.contains("429"), "detail carries the last error: {detail}");
        }
        other => panic!("expected CorrectionFailed, got {other:?}"),
    }
}

// ── Scheduler accounting ─────────────────────────────────────────────────

#[tokio::test]
async fn one_failed_page_does_not_poison_its_siblings() {
    // Sequential admission makes the call order deterministic: page 1 takes
    // one call, page 2 burns all five attempts, page 3 takes one call.
    struct FailMiddle {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for FailMiddle {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _options: &CompletionOptions,
        ) -> Result<String, CompletionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if (1..=5).contains(&n) {
                Err(CompletionError("boom".to_string()))
            } else {
                Ok("limpio".to_string())
            }
        }
    }

    let config = TranscriptConfig::builder()
        .concurrency(1)
        .retry_base_delay_ms(1)
        .retry_jitter_ms(0)
        .build()
        .unwrap();
    let backend = Arc::new(FailMiddle {
        calls: AtomicUsize::new(0),
    });

    let tasks = vec![task(1, "uno"), task(2, "dos"), task(3, "tres")];
    let results = run_corrections(tasks, backend, &config).await;

    assert_eq!(results.len(), 3);
    assert!(results[&1].error.is_none());
    assert!(results[&3].error.is_none());
    assert!(matches!(
        results[&2].error,
        Some(PageError::CorrectionFailed { page: 2, attempts: 5, .. })
    ));

    // The failed page leaves an attributed placeholder in the transcript.
    let text = assemble(&results, 3);
    assert!(text.contains("limpio"));
    assert!(text.contains("[page 2 not corrected:"));
}

#[tokio::test]
async fn concurrency_never_exceeds_the_configured_bound() {
    let probe = Arc::new(ConcurrencyProbe::new());
    let config = TranscriptConfig::builder().concurrency(4).build().unwrap();

    let tasks: Vec<CorrectionTask> = (1..=12).map(|n| task(n, "texto")).collect();
    let results = run_corrections(tasks, probe.clone(), &config).await;

    assert_eq!(results.len(), 12);
    let max = probe.max_seen.load(Ordering::SeqCst);
    assert!(max <= 4, "bound violated: {max} calls in flight");
    assert!(max >= 2, "scheduler never overlapped calls at all");
}

#[tokio::test]
async fn abort_policy_skips_unadmitted_pages_but_keeps_accounting_total() {
    let config = TranscriptConfig::builder()
        .concurrency(1)
        .max_retries(2)
        .retry_base_delay_ms(1)
        .retry_jitter_ms(0)
        .failure_policy(FailurePolicy::AbortOnFirstFailure)
        .build()
        .unwrap();

    let tasks: Vec<CorrectionTask> = (1..=4).map(|n| task(n, "texto")).collect();
    let results = run_corrections(tasks, Arc::new(AlwaysFail), &config).await;

    // Every submitted page has exactly one result, admitted or not.
    assert_eq!(results.len(), 4);
    assert!(matches!(
        results[&1].error,
        Some(PageError::CorrectionFailed { .. })
    ));
    for page in 2..=4 {
        assert!(
            matches!(results[&page].error, Some(PageError::NotAttempted { .. })),
            "page {page} should never have been admitted"
        );
        assert_eq!(results[&page].attempts, 0);
    }
}

// ── Progress accounting ──────────────────────────────────────────────────

struct CountingCallback {
    completes: AtomicUsize,
    errors: AtomicUsize,
}

impl TranscriptProgressCallback for CountingCallback {
    fn on_page_complete(&self, _page: usize, _total: usize, _len: usize) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_error(&self, _page: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn progress_reaches_one_event_per_page_even_with_failures() {
    let cb = Arc::new(CountingCallback {
        completes: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
    });
    let config = TranscriptConfig::builder()
        .concurrency(2)
        .max_retries(1)
        .retry_base_delay_ms(1)
        .retry_jitter_ms(0)
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    // Pages with empty raw text are no-op successes; the rest all fail.
    let tasks = vec![task(1, "texto"), task(2, ""), task(3, "texto")];
    let results = run_corrections(tasks, Arc::new(AlwaysFail), &config).await;

    assert_eq!(results.len(), 3);
    let completes = cb.completes.load(Ordering::SeqCst);
    let errors = cb.errors.load(Ordering::SeqCst);
    assert_eq!(completes + errors, 3, "every page fires exactly one event");
    assert_eq!(completes, 1, "the empty page is the only success");
    assert_eq!(errors, 2);
}

// ── Context isolation ────────────────────────────────────────────────────

#[tokio::test]
async fn corrected_text_comes_from_the_backend_not_the_context() {
    // Tasks carry neighbor text; the result must be exactly what the backend
    // returned, with no neighbor content appended by the pipeline.
    let backend: Arc<dyn CompletionBackend> = Arc::new(AlwaysOk);
    let config = fast_config();

    let t = CorrectionTask {
        page_num: 2,
        current: "el qvijote".to_string(),
        prev: "capitulo anterior".to_string(),
        next: "capitulo siguiente".to_string(),
        strategy: ExtractionStrategy::LocalRecognition,
    };
    let result = correct_page(&backend, &t, &config).await;

    assert_eq!(result.text, "texto corregido");
    assert!(!result.text.contains("anterior"));
    assert!(!result.text.contains("siguiente"));
}
