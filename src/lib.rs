//! # pdf2transcript
//!
//! Turn scanned or digital PDFs into clean, corrected plain-text transcripts
//! using OCR and LLM-based post-correction.
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐
//! │  PDF    │──►│  extraction  │──►│  correction   │──►│   assembly   │
//! │  pages  │   │  text layer/ │   │  LLM, retry,  │   │  page order, │
//! └─────────┘   │  OCR/vision  │   │  bounded conc.│   │  one .txt    │
//!               └──────────────┘   └───────────────┘   └──────────────┘
//! ```
//!
//! Each page's raw text is obtained by the cheapest reliable strategy
//! (embedded text layer, then local Tesseract recognition, then vision-model
//! transcription), corrected by an LLM that sees the neighboring pages as
//! context only, and assembled back in page order regardless of the order
//! corrections completed in.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use pdf2transcript::{transcribe, TranscriptConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TranscriptConfig::builder()
//!     .concurrency(6)
//!     .language("es")
//!     .build()?;
//!
//! let output = transcribe("libro_escaneado.pdf", &config).await?;
//! println!("{}", output.text);
//! for page in output.failed_page_numbers() {
//!     eprintln!("page {page} failed");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing without an LLM
//!
//! Every external capability is an injectable seam: implement
//! [`CompletionBackend`] for the correction calls and (optionally)
//! [`TextRecognizer`] for local OCR, then hand them to the config builder.
//! The whole pipeline runs deterministically against fakes.

pub mod backend;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod transcribe;

pub use backend::{CompletionBackend, CompletionError, LlmBackend};
pub use config::{ExtractionMode, FailurePolicy, TranscriptConfig, TranscriptConfigBuilder};
pub use error::{PageError, TranscriptError};
pub use output::{
    DocumentMetadata, ExtractionStrategy, PageResult, TranscriptOutput, TranscriptStats,
};
pub use pipeline::ocr::{RecognitionError, TextRecognizer};
pub use progress::{NoopProgressCallback, ProgressCallback, TranscriptProgressCallback};
pub use transcribe::{inspect, transcribe, transcribe_to_file};

#[cfg(feature = "local-ocr")]
pub use pipeline::ocr::TesseractRecognizer;
