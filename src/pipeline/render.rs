//! PDF access via pdfium: metadata, embedded text layer, page rasterisation.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## DPI and the pixel cap
//!
//! Pages are rasterised at the configured DPI (a run-wide constant so every
//! page of a document is recognised at the same resolution), but the longest
//! edge is always capped at `max_pixels`: an A0 poster at 200 DPI would
//! otherwise produce a 13 000 px image and exhaust memory.

use crate::error::TranscriptError;
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Extract document metadata from a PDF without rendering pages.
pub async fn extract_metadata(pdf_path: &Path) -> Result<DocumentMetadata, TranscriptError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path))
        .await
        .map_err(|e| TranscriptError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(pdf_path: &Path) -> Result<DocumentMetadata, TranscriptError> {
    let pdfium = Pdfium::default();
    let document = load_document(&pdfium, pdf_path)?;

    let metadata = document.metadata();
    let pages = document.pages();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: pages.len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}

/// Read the embedded text layer of every page, trimmed.
///
/// Returns one entry per page in page order. A page with no text layer (or a
/// whitespace-only one) yields an empty string; the extraction stage treats
/// that as "no embedded text" and moves to the next strategy.
pub async fn embedded_texts(pdf_path: &Path) -> Result<Vec<String>, TranscriptError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || embedded_texts_blocking(&path))
        .await
        .map_err(|e| TranscriptError::Internal(format!("Text-layer task panicked: {}", e)))?
}

fn embedded_texts_blocking(pdf_path: &Path) -> Result<Vec<String>, TranscriptError> {
    let pdfium = Pdfium::default();
    let document = load_document(&pdfium, pdf_path)?;

    let mut texts = Vec::with_capacity(document.pages().len() as usize);
    for page in document.pages().iter() {
        let text = match page.text() {
            Ok(t) => t.all().trim().to_string(),
            // A page without a text object is normal for scans; not an error.
            Err(_) => String::new(),
        };
        texts.push(text);
    }
    Ok(texts)
}

/// Rasterise the given pages (0-based indices) into images.
///
/// Out-of-range indices are an internal error: callers derive indices from
/// the page count of the same document.
pub async fn render_pages(
    pdf_path: &Path,
    page_indices: &[usize],
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, TranscriptError> {
    let path = pdf_path.to_path_buf();
    let indices = page_indices.to_vec();

    tokio::task::spawn_blocking(move || render_pages_blocking(&path, &indices, dpi, max_pixels))
        .await
        .map_err(|e| TranscriptError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_pages_blocking(
    pdf_path: &Path,
    page_indices: &[usize],
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<(usize, DynamicImage)>, TranscriptError> {
    let pdfium = Pdfium::default();
    let document = load_document(&pdfium, pdf_path)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            return Err(TranscriptError::RasterisationFailed {
                page: idx + 1,
                detail: format!("index out of range (document has {total_pages} pages)"),
            });
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| TranscriptError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        // Page width in points (1/72 inch) scaled to the configured DPI,
        // capped at max_pixels on the longest edge.
        let width_px = (page.width().value / 72.0 * dpi as f32) as i32;
        let target_width = width_px.clamp(1, max_pixels as i32);

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_maximum_height(max_pixels as i32);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            TranscriptError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push((idx, image));
    }

    Ok(results)
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
) -> Result<PdfDocument<'a>, TranscriptError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| TranscriptError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}
