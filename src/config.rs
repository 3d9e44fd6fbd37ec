//! Configuration types for PDF-to-transcript runs.
//!
//! All pipeline behaviour is controlled through [`TranscriptConfig`], built
//! via its [`TranscriptConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::backend::CompletionBackend;
use crate::error::TranscriptError;
use crate::pipeline::ocr::TextRecognizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a PDF-to-transcript run.
///
/// Built via [`TranscriptConfig::builder()`] or using
/// [`TranscriptConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2transcript::TranscriptConfig;
///
/// let config = TranscriptConfig::builder()
///     .concurrency(4)
///     .max_retries(3)
///     .language("en")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranscriptConfig {
    /// Rendering DPI used when rasterising a page for recognition. Range: 72–400. Default: 200.
    ///
    /// Resolution is a run-wide constant, never a per-call choice: recognition
    /// accuracy depends on it and two pages of the same document must be
    /// rasterised identically. 200 DPI is sharp enough for Tesseract on body
    /// text while keeping images small enough for vision API upload limits.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI. A 200-DPI render of an A0 poster could
    /// produce a 13 000 × 18 000 px image and exhaust memory. This field caps
    /// either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Number of concurrent correction calls in flight. Default: 6.
    ///
    /// Correction is network-bound, not CPU-bound, so concurrency cuts
    /// wall-clock time almost linearly until the provider's rate limit. The
    /// bound holds regardless of document length: a 1 000-page document never
    /// spawns 1 000 simultaneous calls. If you hit `429` errors, lower this.
    pub concurrency: usize,

    /// LLM model identifier, e.g. "gpt-4o-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed completion backend. Takes precedence over
    /// `provider_name`. Inject a fake here in tests.
    pub backend: Option<Arc<dyn CompletionBackend>>,

    /// Pre-constructed local recognition engine. If None and the `local-ocr`
    /// feature is enabled, a Tesseract engine is initialised lazily on the
    /// first page that needs it and reused for the rest of the run.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Sampling temperature for correction completions. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to the recognised text.
    /// Higher values introduce creativity that worsens correction accuracy.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page. Default: 2048.
    pub max_output_tokens: usize,

    /// Maximum correction attempts per page. Default: 5.
    ///
    /// Transient failures (timeouts, 429s, malformed responses) are retried
    /// up to this many total attempts. Exhaustion is a terminal per-page
    /// failure recorded in the results, never a silent fallback to raw text.
    pub max_retries: u32,

    /// Base retry delay in milliseconds (exponential backoff). Default: 1500.
    ///
    /// The wait before attempt n+1 is `base * 2^(n-1)` plus jitter:
    /// 1.5 s → 3 s → 6 s → 12 s with the defaults.
    pub retry_base_delay_ms: u64,

    /// Jitter ceiling in milliseconds added to each backoff wait. Default: 500.
    ///
    /// A uniform random component desynchronises retries across concurrently
    /// failing tasks so a recovering endpoint is not hit by a thundering herd.
    pub retry_jitter_ms: u64,

    /// OCR language hint for local recognition (ISO-like short code). Default: "es".
    pub language: String,

    /// Per-page extraction strategy policy. Default: [`ExtractionMode::Auto`].
    pub mode: ExtractionMode,

    /// What happens after a page's correction fails terminally.
    /// Default: [`FailurePolicy::CollectFailures`].
    pub failure_policy: FailurePolicy,

    /// Directory for per-page raw/cleaned scratch files. If None, a temporary
    /// directory is created and removed when the run finishes.
    pub work_dir: Option<PathBuf>,

    /// Custom correction system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Optional progress callback fired as pages complete (in any order).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 2000,
            concurrency: 6,
            model: None,
            provider_name: None,
            backend: None,
            recognizer: None,
            temperature: 0.1,
            max_output_tokens: 2048,
            max_retries: 5,
            retry_base_delay_ms: 1500,
            retry_jitter_ms: 500,
            language: "es".to_string(),
            mode: ExtractionMode::default(),
            failure_policy: FailurePolicy::default(),
            work_dir: None,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranscriptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn CompletionBackend>"))
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("retry_jitter_ms", &self.retry_jitter_ms)
            .field("language", &self.language)
            .field("mode", &self.mode)
            .field("failure_policy", &self.failure_policy)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl TranscriptConfig {
    /// Create a new builder for `TranscriptConfig`.
    pub fn builder() -> TranscriptConfigBuilder {
        TranscriptConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranscriptConfig`].
#[derive(Debug)]
pub struct TranscriptConfigBuilder {
    config: TranscriptConfig,
}

impl TranscriptConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_output_tokens(mut self, n: usize) -> Self {
        self.config.max_output_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn retry_base_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry_base_delay_ms = ms;
        self
    }

    pub fn retry_jitter_ms(mut self, ms: u64) -> Self {
        self.config.retry_jitter_ms = ms;
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranscriptConfig, TranscriptError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(TranscriptError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(TranscriptError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_retries == 0 {
            return Err(TranscriptError::InvalidConfig(
                "max_retries must be ≥ 1".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(TranscriptError::InvalidConfig(
                "language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which extraction path obtains a page's raw text.
///
/// The mode is a policy, not a heuristic override: `Auto` follows the
/// cheapest-reliable chain per page, the other two force a specific step for
/// every page of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Embedded text layer when present, else local recognition, else vision
    /// transcription. (default)
    #[default]
    Auto,
    /// Always run local recognition, even when an embedded text layer exists.
    Local,
    /// Always use vision transcription; never touch the text layer or the
    /// local engine.
    Vision,
}

/// What the scheduler does after a page's correction fails terminally.
///
/// The choice is a top-level contract, fixed for the whole run — never an
/// accident of which task happens to fail first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Run every page to completion and report all failures together. (default)
    #[default]
    CollectFailures,
    /// Stop admitting new pages after the first terminal failure. In-flight
    /// calls finish naturally; never-admitted pages are recorded as
    /// not-attempted failures so accounting stays total.
    AbortOnFirstFailure,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = TranscriptConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.concurrency, 6);
        assert_eq!(c.max_retries, 5);
        assert_eq!(c.retry_base_delay_ms, 1500);
        assert_eq!(c.retry_jitter_ms, 500);
        assert_eq!(c.language, "es");
        assert_eq!(c.mode, ExtractionMode::Auto);
        assert_eq!(c.failure_policy, FailurePolicy::CollectFailures);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = TranscriptConfig::builder()
            .dpi(1000)
            .concurrency(0)
            .max_retries(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 400);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.max_retries, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_empty_language() {
        let err = TranscriptConfig::builder().language("  ").build();
        assert!(matches!(err, Err(TranscriptError::InvalidConfig(_))));
    }
}
