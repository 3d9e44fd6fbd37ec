//! Output types: per-page results, run statistics, and the assembled transcript.
//!
//! Everything here is serde-serialisable so `--json` output and structured
//! logging work without conversion glue.

use crate::error::{PageError, TranscriptError};
use serde::{Deserialize, Serialize};

/// How a page's raw text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    /// The PDF carried a non-empty embedded text layer.
    EmbeddedText,
    /// Local recognition (Tesseract) on a rasterised page image.
    LocalRecognition,
    /// Vision-model transcription of the page image with neighbor context.
    VisionTranscription,
    /// No strategy produced text; the page degraded to an empty raw string.
    Unavailable,
}

/// The outcome of one page's trip through the pipeline.
///
/// A failed page still produces a `PageResult` — `error` is `Some` and `text`
/// is empty. The results set always has exactly one entry per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page number.
    pub page_num: usize,
    /// Cleaned text for the page. Empty when the page failed or its raw text
    /// was empty.
    pub text: String,
    /// How the raw text was extracted.
    pub strategy: ExtractionStrategy,
    /// Correction attempts actually made (0 for empty-raw-text no-ops).
    pub attempts: u32,
    /// Wall-clock milliseconds spent correcting this page, including backoff.
    pub duration_ms: u64,
    /// Terminal failure, if the page's correction exhausted its retries or
    /// the page was never admitted after an abort decision.
    pub error: Option<PageError>,
}

/// Document metadata read from the PDF without any LLM involvement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate statistics for a transcription run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose correction succeeded (including empty-page no-ops).
    pub corrected_pages: usize,
    /// Pages whose correction terminated in failure.
    pub failed_pages: usize,
    /// Pages whose raw text was empty (extraction produced nothing).
    pub empty_pages: usize,
    /// Wall-clock milliseconds spent in extraction.
    pub extraction_duration_ms: u64,
    /// Wall-clock milliseconds spent in the correction phase.
    pub correction_duration_ms: u64,
    /// Total run duration in milliseconds.
    pub total_duration_ms: u64,
}

/// The complete result of a transcription run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptOutput {
    /// The assembled transcript: all pages in order, blank-line separated,
    /// with explicit placeholders for failed pages.
    pub text: String,
    /// Per-page results, sorted by page number, one entry per page.
    pub pages: Vec<PageResult>,
    /// Document metadata.
    pub metadata: DocumentMetadata,
    /// Run statistics.
    pub stats: TranscriptStats,
}

impl TranscriptOutput {
    /// 1-based indices of pages that failed, in page order.
    pub fn failed_page_numbers(&self) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.error.is_some())
            .map(|p| p.page_num)
            .collect()
    }

    /// Treat any page failure as an error.
    ///
    /// [`crate::transcribe`] returns `Ok` with placeholders for failed pages
    /// under the collect policy; callers who want all-or-nothing call this to
    /// convert partial success into [`TranscriptError::PagesFailed`].
    pub fn into_strict_result(self) -> Result<TranscriptOutput, TranscriptError> {
        let failed = self.failed_page_numbers();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(TranscriptError::PagesFailed {
                failed_pages: failed,
                total: self.stats.total_pages,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, err: Option<PageError>) -> PageResult {
        PageResult {
            page_num: n,
            text: if err.is_none() { format!("page {n}") } else { String::new() },
            strategy: ExtractionStrategy::EmbeddedText,
            attempts: 1,
            duration_ms: 10,
            error: err,
        }
    }

    fn output(pages: Vec<PageResult>) -> TranscriptOutput {
        let total = pages.len();
        let failed = pages.iter().filter(|p| p.error.is_some()).count();
        TranscriptOutput {
            text: String::new(),
            pages,
            metadata: DocumentMetadata {
                title: None,
                author: None,
                subject: None,
                creator: None,
                producer: None,
                creation_date: None,
                modification_date: None,
                page_count: total,
                pdf_version: "1.7".into(),
            },
            stats: TranscriptStats {
                total_pages: total,
                corrected_pages: total - failed,
                failed_pages: failed,
                empty_pages: 0,
                extraction_duration_ms: 0,
                correction_duration_ms: 0,
                total_duration_ms: 0,
            },
        }
    }

    #[test]
    fn strict_result_passes_clean_run() {
        let out = output(vec![page(1, None), page(2, None)]);
        assert!(out.into_strict_result().is_ok());
    }

    #[test]
    fn strict_result_rejects_partial_run() {
        let out = output(vec![
            page(1, None),
            page(
                2,
                Some(PageError::CorrectionFailed {
                    page: 2,
                    attempts: 5,
                    detail: "timeout".into(),
                }),
            ),
        ]);
        match out.into_strict_result() {
            Err(TranscriptError::PagesFailed { failed_pages, total }) => {
                assert_eq!(failed_pages, vec![2]);
                assert_eq!(total, 2);
            }
            other => panic!("expected PagesFailed, got {other:?}"),
        }
    }

    #[test]
    fn output_round_trips_through_json() {
        let out = output(vec![page(1, None)]);
        let json = serde_json::to_string(&out).unwrap();
        let back: TranscriptOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pages.len(), 1);
        assert_eq!(back.pages[0].page_num, 1);
    }
}
