//! Local recognition: the `TextRecognizer` seam and its Tesseract backing.
//!
//! The engine is an explicitly constructed, injected dependency — never a
//! module-level singleton — so tests can substitute a fake and the pipeline
//! can run without Tesseract installed (the extraction stage then falls
//! through to vision transcription).
//!
//! Initialisation is lazy and the engine is reused across every page of a
//! run: Tesseract loads its language model from disk on startup, which is far
//! too expensive to repeat per page.

use image::DynamicImage;
use thiserror::Error;

/// A failed recognition attempt or engine initialisation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RecognitionError(pub String);

/// Recognise the text visible in a rasterised page image.
///
/// Implementations are called from `spawn_blocking` contexts; they may block.
/// They must be `Send + Sync` because the handle is shared for the whole run.
pub trait TextRecognizer: Send + Sync {
    /// Extract text from the image; detected lines joined with `\n`.
    fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError>;
}

/// Normalise raw engine output: trim each line, drop empty ones, join with
/// newlines. Keeps recognised text stable across engines that differ in
/// trailing-whitespace behaviour.
pub fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map a short ISO 639-1 language code to the tessdata name Tesseract wants
/// ("es" → "spa"). Codes without a known mapping pass through unchanged, so
/// callers can hand in a tessdata name directly.
pub fn tessdata_code(language: &str) -> &str {
    match language {
        "es" => "spa",
        "en" => "eng",
        "fr" => "fra",
        "de" => "deu",
        "it" => "ita",
        "pt" => "por",
        "ca" => "cat",
        "nl" => "nld",
        other => other,
    }
}

#[cfg(feature = "local-ocr")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "local-ocr")]
mod tesseract {
    use super::{normalize_lines, RecognitionError, TextRecognizer};
    use crate::pipeline::encode::encode_png_bytes;
    use image::DynamicImage;
    use leptess::LepTess;
    use std::sync::Mutex;
    use tracing::debug;

    /// Tesseract-backed recogniser via `leptess`.
    ///
    /// `LepTess` is `Send` but not `Sync`; the `Mutex` serialises access.
    /// Extraction runs page-at-a-time anyway, so the lock is uncontended.
    pub struct TesseractRecognizer {
        engine: Mutex<LepTess>,
        language: String,
    }

    impl TesseractRecognizer {
        /// Initialise Tesseract for the given language (e.g. "spa", "eng").
        ///
        /// Fails when the tessdata for the language is not installed; callers
        /// treat that as "engine unavailable" and fall through to vision.
        pub fn new(language: &str) -> Result<Self, RecognitionError> {
            let engine = LepTess::new(None, language).map_err(|e| {
                RecognitionError(format!(
                    "Tesseract init failed for language '{language}': {e}"
                ))
            })?;
            debug!("Tesseract engine initialised (lang={language})");
            Ok(Self {
                engine: Mutex::new(engine),
                language: language.to_string(),
            })
        }

        /// The language this engine was initialised with.
        pub fn language(&self) -> &str {
            &self.language
        }
    }

    impl TextRecognizer for TesseractRecognizer {
        fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
            let png = encode_png_bytes(image)
                .map_err(|e| RecognitionError(format!("PNG encode failed: {e}")))?;

            let mut engine = self
                .engine
                .lock()
                .map_err(|_| RecognitionError("recognizer mutex poisoned".into()))?;

            engine
                .set_image_from_mem(&png)
                .map_err(|e| RecognitionError(format!("set_image failed: {e}")))?;

            let raw = engine
                .get_utf8_text()
                .map_err(|e| RecognitionError(format!("recognition failed: {e}")))?;

            Ok(normalize_lines(&raw))
        }
    }
}
