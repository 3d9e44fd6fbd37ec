//! Error types for the pdf2transcript library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranscriptError`] — **Fatal**: the run cannot proceed at all
//!   (bad input file, missing credentials, invalid configuration). Returned as
//!   `Err(TranscriptError)` from the top-level `transcribe*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (correction retries
//!   exhausted, or the page was never admitted after an abort decision) but
//!   the other pages are fine. Stored inside
//!   [`crate::output::PageResult`] so callers can inspect partial success
//!   rather than losing the whole transcript to one bad page.
//!
//! Extraction failures are deliberately absent from both: a page whose raw
//! text cannot be obtained degrades to an empty string and flows through the
//! pipeline as a no-op, per the extraction contract.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2transcript library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TranscriptError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The document has zero pages; there is nothing to transcribe.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every page failed correction after all retries; output would be empty.
    #[error("All {total} pages failed after {retries} attempts each.\nFirst error: {first_error}")]
    AllPagesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// Some pages succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::TranscriptOutput::into_strict_result`]
    /// when the caller wants to treat any page failure as an error, and by
    /// [`crate::transcribe`] under
    /// [`crate::config::FailurePolicy::AbortOnFirstFailure`].
    #[error("{} page(s) failed during transcription: {}", failed_pages.len(), format_pages(failed_pages))]
    PagesFailed {
        failed_pages: Vec<usize>,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output or scratch file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_pages(pages: &[usize]) -> String {
    pages
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A non-fatal error for a single page.
///
/// Stored inside [`crate::output::PageResult`] when a page's correction
/// terminates in failure. The overall run continues unless ALL pages fail
/// or the abort-on-first-failure policy is active.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Correction call failed after exhausting every retry attempt.
    #[error("Page {page}: correction failed after {attempts} attempts: {detail}")]
    CorrectionFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The page was never admitted: a prior terminal failure triggered the
    /// abort-on-first-failure policy before this page got a slot.
    #[error("Page {page}: not attempted (batch aborted after an earlier failure)")]
    NotAttempted { page: usize },
}

impl PageError {
    /// 1-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::CorrectionFailed { page, .. } => *page,
            PageError::NotAttempted { page } => *page,
        }
    }
}
