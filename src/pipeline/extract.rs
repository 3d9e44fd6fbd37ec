//! The raw page source: obtain raw text for every page by the cheapest
//! reliable strategy.
//!
//! Per-page decision chain (in `Auto` mode):
//!
//! 1. **Embedded text layer** — free and the most faithful source; used
//!    verbatim (trimmed) whenever non-empty.
//! 2. **Local recognition** — the page is rasterised at the configured DPI
//!    and fed to Tesseract. The engine initialises lazily on the first page
//!    that needs it and is reused for the rest of the run.
//! 3. **Vision transcription** — one request carrying the current page image
//!    plus its immediate neighbors as context-only images.
//!
//! `Local` mode skips step 1; `Vision` mode skips steps 1–2 and renders the
//! whole document once so neighbor images are reused rather than re-rendered.
//!
//! No strategy failing is fatal: a page that yields nothing degrades to an
//! empty raw string and flows through the rest of the pipeline as a no-op.
//! Rasterised page buffers live only as long as the page (or its immediate
//! neighbors) need them; nothing is written to disk here.

use crate::backend::CompletionBackend;
use crate::config::{ExtractionMode, TranscriptConfig};
use crate::error::TranscriptError;
use crate::output::ExtractionStrategy;
use crate::pipeline::encode::encode_page;
use crate::pipeline::ocr::TextRecognizer;
use crate::pipeline::render;
use crate::prompts::{vision_instruction, VISION_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData};
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A page's raw text, captured once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// 1-based page number.
    pub page_num: usize,
    /// Raw text, possibly empty when no strategy produced anything.
    pub text: String,
    /// Which strategy produced the text.
    pub strategy: ExtractionStrategy,
}

/// Extract raw text for every page of the document, in page order.
///
/// Returns exactly `page_count` entries. Only document-level failures
/// (unreadable PDF) are fatal; per-page extraction trouble degrades to an
/// empty raw string.
pub async fn extract_pages(
    pdf_path: &Path,
    page_count: usize,
    config: &TranscriptConfig,
    backend: &Arc<dyn CompletionBackend>,
) -> Result<Vec<RawPage>, TranscriptError> {
    match config.mode {
        ExtractionMode::Vision => extract_all_vision(pdf_path, page_count, config, backend).await,
        ExtractionMode::Auto | ExtractionMode::Local => {
            extract_chain(pdf_path, page_count, config, backend).await
        }
    }
}

/// The embedded-text → local-recognition → vision chain (`Auto`/`Local`).
async fn extract_chain(
    pdf_path: &Path,
    page_count: usize,
    config: &TranscriptConfig,
    backend: &Arc<dyn CompletionBackend>,
) -> Result<Vec<RawPage>, TranscriptError> {
    let use_embedded = config.mode == ExtractionMode::Auto;
    let embedded = if use_embedded {
        render::embedded_texts(pdf_path).await?
    } else {
        vec![String::new(); page_count]
    };

    let mut recognizer = RecognizerSlot::new(config);
    let mut pages = Vec::with_capacity(page_count);

    for i in 0..page_count {
        let page_num = i + 1;

        if use_embedded && !embedded[i].is_empty() {
            debug!("Page {page_num}: embedded text layer ({} chars)", embedded[i].len());
            pages.push(RawPage {
                page_num,
                text: embedded[i].clone(),
                strategy: ExtractionStrategy::EmbeddedText,
            });
            continue;
        }

        if let Some(engine) = recognizer.acquire() {
            match recognize_page(pdf_path, i, config, engine).await {
                Ok(text) => {
                    debug!("Page {page_num}: local recognition ({} chars)", text.len());
                    pages.push(RawPage {
                        page_num,
                        text,
                        strategy: ExtractionStrategy::LocalRecognition,
                    });
                    continue;
                }
                Err(e) => {
                    warn!("Page {page_num}: local recognition failed ({e}), trying vision");
                }
            }
        }

        match vision_page(pdf_path, i, page_count, config, backend).await {
            Ok(text) => {
                debug!("Page {page_num}: vision transcription ({} chars)", text.len());
                pages.push(RawPage {
                    page_num,
                    text,
                    strategy: ExtractionStrategy::VisionTranscription,
                });
            }
            Err(e) => {
                warn!("Page {page_num}: no extraction strategy produced text ({e}); raw text is empty");
                pages.push(RawPage {
                    page_num,
                    text: String::new(),
                    strategy: ExtractionStrategy::Unavailable,
                });
            }
        }
    }

    Ok(pages)
}

/// Forced vision mode: render every page once up front so each request reuses
/// its neighbors' renders instead of rasterising them three times over.
async fn extract_all_vision(
    pdf_path: &Path,
    page_count: usize,
    config: &TranscriptConfig,
    backend: &Arc<dyn CompletionBackend>,
) -> Result<Vec<RawPage>, TranscriptError> {
    info!("Vision extraction: rendering all {page_count} pages");
    let indices: Vec<usize> = (0..page_count).collect();
    let rendered = render::render_pages(pdf_path, &indices, config.dpi, config.max_rendered_pixels)
        .await?;
    let images: Vec<DynamicImage> = rendered.into_iter().map(|(_, img)| img).collect();

    let mut pages = Vec::with_capacity(page_count);
    for i in 0..page_count {
        let page_num = i + 1;
        let prev = if i > 0 { Some(&images[i - 1]) } else { None };
        let next = images.get(i + 1);

        match vision_transcribe(backend, config, prev, &images[i], next).await {
            Ok(text) => pages.push(RawPage {
                page_num,
                text,
                strategy: ExtractionStrategy::VisionTranscription,
            }),
            Err(e) => {
                warn!("Page {page_num}: vision transcription failed ({e}); raw text is empty");
                pages.push(RawPage {
                    page_num,
                    text: String::new(),
                    strategy: ExtractionStrategy::Unavailable,
                });
            }
        }
    }

    Ok(pages)
}

/// Rasterise one page and run the local engine on it.
///
/// The rendered buffer lives only for the duration of this call.
async fn recognize_page(
    pdf_path: &Path,
    index: usize,
    config: &TranscriptConfig,
    engine: Arc<dyn TextRecognizer>,
) -> Result<String, TranscriptError> {
    let mut rendered =
        render::render_pages(pdf_path, &[index], config.dpi, config.max_rendered_pixels).await?;
    let (_, image) = rendered
        .pop()
        .ok_or_else(|| TranscriptError::Internal(format!("page {} not rendered", index + 1)))?;

    tokio::task::spawn_blocking(move || {
        engine
            .recognize(&image)
            .map_err(|e| TranscriptError::Internal(e.to_string()))
    })
    .await
    .map_err(|e| TranscriptError::Internal(format!("Recognition task panicked: {e}")))?
}

/// Rasterise a page and its immediate neighbors, then transcribe via vision.
async fn vision_page(
    pdf_path: &Path,
    index: usize,
    page_count: usize,
    config: &TranscriptConfig,
    backend: &Arc<dyn CompletionBackend>,
) -> Result<String, TranscriptError> {
    let mut indices = Vec::with_capacity(3);
    if index > 0 {
        indices.push(index - 1);
    }
    indices.push(index);
    if index + 1 < page_count {
        indices.push(index + 1);
    }

    let rendered =
        render::render_pages(pdf_path, &indices, config.dpi, config.max_rendered_pixels).await?;

    let find = |want: usize| rendered.iter().find(|(i, _)| *i == want).map(|(_, img)| img);
    let current = find(index)
        .ok_or_else(|| TranscriptError::Internal(format!("page {} not rendered", index + 1)))?;
    let prev = if index > 0 { find(index - 1) } else { None };
    let next = find(index + 1);

    vision_transcribe(backend, config, prev, current, next).await
}

/// One vision request: current page image plus optional neighbor images,
/// instruction text naming which attachment is which.
async fn vision_transcribe(
    backend: &Arc<dyn CompletionBackend>,
    config: &TranscriptConfig,
    prev: Option<&DynamicImage>,
    current: &DynamicImage,
    next: Option<&DynamicImage>,
) -> Result<String, TranscriptError> {
    let encode = |img: &DynamicImage| -> Result<ImageData, TranscriptError> {
        encode_page(img).map_err(|e| TranscriptError::Internal(format!("PNG encode failed: {e}")))
    };

    let mut images = Vec::with_capacity(3);
    if let Some(img) = prev {
        images.push(encode(img)?);
    }
    images.push(encode(current)?);
    if let Some(img) = next {
        images.push(encode(img)?);
    }

    let messages = vec![
        ChatMessage::system(VISION_SYSTEM_PROMPT),
        ChatMessage::user_with_images(
            vision_instruction(prev.is_some(), next.is_some()),
            images,
        ),
    ];

    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_output_tokens),
        ..Default::default()
    };

    let text = backend
        .complete(&messages, &options)
        .await
        .map_err(|e| TranscriptError::Internal(format!("vision transcription failed: {e}")))?;

    Ok(text.trim().to_string())
}

/// Lazy, once-per-run holder for the local recognition engine.
///
/// Initialisation is attempted at most once; a failed init (missing
/// tessdata, feature disabled) marks the engine unavailable for the rest of
/// the run instead of re-failing on every page.
struct RecognizerSlot<'a> {
    config: &'a TranscriptConfig,
    state: SlotState,
}

enum SlotState {
    Uninit,
    Ready(Arc<dyn TextRecognizer>),
    Unavailable,
}

impl<'a> RecognizerSlot<'a> {
    fn new(config: &'a TranscriptConfig) -> Self {
        Self {
            config,
            state: SlotState::Uninit,
        }
    }

    fn acquire(&mut self) -> Option<Arc<dyn TextRecognizer>> {
        if let SlotState::Uninit = self.state {
            self.state = match self.init() {
                Some(engine) => SlotState::Ready(engine),
                None => SlotState::Unavailable,
            };
        }
        match &self.state {
            SlotState::Ready(engine) => Some(Arc::clone(engine)),
            _ => None,
        }
    }

    fn init(&self) -> Option<Arc<dyn TextRecognizer>> {
        if let Some(ref engine) = self.config.recognizer {
            return Some(Arc::clone(engine));
        }
        self.init_builtin()
    }

    #[cfg(feature = "local-ocr")]
    fn init_builtin(&self) -> Option<Arc<dyn TextRecognizer>> {
        use crate::pipeline::ocr::{tessdata_code, TesseractRecognizer};
        let lang = tessdata_code(&self.config.language);
        match TesseractRecognizer::new(lang) {
            Ok(engine) => Some(Arc::new(engine)),
            Err(e) => {
                warn!("Local recognition unavailable: {e}");
                None
            }
        }
    }

    #[cfg(not(feature = "local-ocr"))]
    fn init_builtin(&self) -> Option<Arc<dyn TextRecognizer>> {
        debug!("Local recognition not compiled in (feature `local-ocr`)");
        None
    }
}
