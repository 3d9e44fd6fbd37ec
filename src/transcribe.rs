//! Top-level orchestration: one call from PDF path to assembled transcript.
//!
//! The run has three phases with a hard barrier between the first two:
//!
//! 1. **Extraction** — raw text is obtained for every page and fully
//!    materialised before any correction starts. Context windows are built
//!    from this frozen sequence, so page k's correction can never observe a
//!    half-extracted document.
//! 2. **Correction** — every non-empty page goes through the retrying
//!    correction unit under the bounded-concurrency scheduler.
//! 3. **Assembly** — results join in page order into the final transcript.
//!
//! Backend resolution happens before any page work, so a missing credential
//! fails in milliseconds instead of after minutes of extraction.
//!
//! Per-page scratch files (raw and cleaned text) are written under
//! `work_dir` when set, or a temporary directory that is removed when the
//! run finishes. They are write-only debugging artifacts; nothing reads them
//! back.

use crate::backend::resolve_backend;
use crate::config::{FailurePolicy, TranscriptConfig};
use crate::error::TranscriptError;
use crate::output::{DocumentMetadata, TranscriptOutput, TranscriptStats};
use crate::pipeline::assemble::{assemble, page_key};
use crate::pipeline::correct::CorrectionTask;
use crate::pipeline::extract::extract_pages;
use crate::pipeline::input::resolve_input;
use crate::pipeline::schedule::run_corrections;
use crate::pipeline::window::window;
use crate::pipeline::render;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transcribe a PDF into cleaned text.
///
/// Under the default [`FailurePolicy::CollectFailures`] a run with page
/// failures still returns `Ok`: the transcript carries placeholders for the
/// failed pages and `output.pages` records each failure. Call
/// [`TranscriptOutput::into_strict_result`] to convert partial success into
/// an error. Only [`FailurePolicy::AbortOnFirstFailure`] and whole-run
/// problems (bad input, no credentials, every page failing) produce `Err`.
///
/// # Example
/// ```rust,no_run
/// use pdf2transcript::{transcribe, TranscriptConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TranscriptConfig::default();
/// let output = transcribe("libro_escaneado.pdf", &config).await?;
/// println!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn transcribe(
    input: impl AsRef<str>,
    config: &TranscriptConfig,
) -> Result<TranscriptOutput, TranscriptError> {
    let run_start = Instant::now();

    let pdf_path = resolve_input(input.as_ref())?;
    // Resolve credentials before touching the document.
    let backend = resolve_backend(config)?;

    let metadata = render::extract_metadata(&pdf_path).await?;
    let page_count = metadata.page_count;
    if page_count == 0 {
        return Err(TranscriptError::EmptyDocument { path: pdf_path });
    }
    info!(
        "Transcribing '{}': {page_count} pages, mode {:?}",
        pdf_path.display(),
        config.mode
    );

    let scratch = ScratchDir::prepare(config)?;

    // Phase 1: extraction. Fully materialised before any correction starts.
    let extraction_start = Instant::now();
    let raw_pages = extract_pages(&pdf_path, page_count, config, &backend).await?;
    let extraction_duration = extraction_start.elapsed();

    let raw_texts: Vec<String> = raw_pages.iter().map(|p| p.text.clone()).collect();
    let empty_pages = raw_texts.iter().filter(|t| t.trim().is_empty()).count();
    debug!(
        "Extraction done in {:?}: {empty_pages}/{page_count} pages empty",
        extraction_duration
    );

    for page in &raw_pages {
        scratch.write("raw", page.page_num, page_count, &page.text)?;
    }

    // Context windows are frozen here, before any task is dispatched.
    let tasks: Vec<CorrectionTask> = raw_pages
        .iter()
        .map(|page| {
            let w = window(&raw_texts, page.page_num);
            CorrectionTask {
                page_num: page.page_num,
                current: page.text.clone(),
                prev: w.prev.to_string(),
                next: w.next.to_string(),
                strategy: page.strategy,
            }
        })
        .collect();

    // Phase 2: bounded-concurrency correction.
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(page_count);
    }
    let correction_start = Instant::now();
    let results = run_corrections(tasks, backend, config).await;
    let correction_duration = correction_start.elapsed();

    for result in results.values() {
        if result.error.is_none() && !result.text.is_empty() {
            scratch.write("cleaned", result.page_num, page_count, &result.text)?;
        }
    }

    let failed: Vec<usize> = results
        .values()
        .filter(|r| r.error.is_some())
        .map(|r| r.page_num)
        .collect();
    let corrected = page_count - failed.len();

    if !failed.is_empty() {
        warn!("{} of {page_count} pages failed correction", failed.len());

        // Every page that had text to correct failed: the transcript would
        // be nothing but placeholders.
        let attempted = page_count - empty_pages;
        if attempted > 0 && failed.len() >= attempted {
            let first_error = results
                .values()
                .find_map(|r| r.error.as_ref().map(|e| e.to_string()))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(TranscriptError::AllPagesFailed {
                total: page_count,
                retries: config.max_retries,
                first_error,
            });
        }

        if config.failure_policy == FailurePolicy::AbortOnFirstFailure {
            return Err(TranscriptError::PagesFailed {
                failed_pages: failed,
                total: page_count,
            });
        }
    }

    // Phase 3: ordered assembly.
    let text = assemble(&results, page_count);

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(page_count, corrected);
    }

    let stats = TranscriptStats {
        total_pages: page_count,
        corrected_pages: corrected,
        failed_pages: failed.len(),
        empty_pages,
        extraction_duration_ms: extraction_duration.as_millis() as u64,
        correction_duration_ms: correction_duration.as_millis() as u64,
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };
    info!(
        "Run complete in {}ms: {corrected}/{page_count} pages corrected",
        stats.total_duration_ms
    );

    Ok(TranscriptOutput {
        text,
        pages: results.into_values().collect(),
        metadata,
        stats,
    })
}

/// Transcribe a PDF and write the transcript to `output_path`.
///
/// The write is atomic: the transcript lands in a sibling temporary file
/// first and is renamed into place, so a crash mid-write never leaves a
/// truncated transcript at the destination.
pub async fn transcribe_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &TranscriptConfig,
) -> Result<TranscriptOutput, TranscriptError> {
    let output = transcribe(input, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| TranscriptError::OutputWriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let tmp = path.with_extension("txt.tmp");
    std::fs::write(&tmp, &output.text).map_err(|e| TranscriptError::OutputWriteFailed {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| TranscriptError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("Transcript written to '{}'", path.display());
    Ok(output)
}

/// Read a PDF's metadata without invoking any LLM.
pub async fn inspect(input: impl AsRef<str>) -> Result<DocumentMetadata, TranscriptError> {
    let pdf_path = resolve_input(input.as_ref())?;
    render::extract_metadata(&pdf_path).await
}

/// The per-run scratch directory for raw/cleaned page files.
///
/// Holding the `TempDir` keeps a temporary scratch area alive for the run;
/// dropping it removes the files. A caller-supplied `work_dir` is never
/// removed.
struct ScratchDir {
    root: std::path::PathBuf,
    _temp: Option<tempfile::TempDir>,
}

impl ScratchDir {
    fn prepare(config: &TranscriptConfig) -> Result<Self, TranscriptError> {
        let (root, temp) = match config.work_dir {
            Some(ref dir) => (dir.clone(), None),
            None => {
                let temp = tempfile::tempdir().map_err(|e| {
                    TranscriptError::OutputWriteFailed {
                        path: std::env::temp_dir(),
                        source: e,
                    }
                })?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };

        for sub in ["raw", "cleaned"] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|e| TranscriptError::OutputWriteFailed {
                path: dir,
                source: e,
            })?;
        }

        debug!("Scratch directory: {}", root.display());
        Ok(Self { root, _temp: temp })
    }

    /// Write one page's text under `<root>/<sub>/<key>.txt`. The zero-padded
    /// key keeps lexicographic file order equal to page order.
    fn write(
        &self,
        sub: &str,
        page_num: usize,
        page_count: usize,
        text: &str,
    ) -> Result<(), TranscriptError> {
        let path = self
            .root
            .join(sub)
            .join(format!("{}.txt", page_key(page_num, page_count)));
        std::fs::write(&path, text).map_err(|e| TranscriptError::OutputWriteFailed {
            path,
            source: e,
        })
    }
}
