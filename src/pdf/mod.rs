//! Paginated-document rendering on `lopdf`.
//!
//! A render parses the source, resolves the page window, copies the window
//! into a new document, tiles the watermark onto every copied page and
//! serializes the result. Unlike raster rendering nothing here degrades to
//! the original: any failure fails the request.

pub mod compose;
pub mod extract;
pub mod window;

use lopdf::Document;

pub use compose::{compose_watermark, embed_watermark, save_document, ComposeReport, EmbeddedWatermark};
pub use extract::{extract_pages, ExtractedDocument};
pub use window::{resolve_window, PageWindow};

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::watermark::WatermarkRaster;

/// A finished, watermarked PDF
#[derive(Debug, Clone)]
pub struct PdfRendering {
    pub bytes: Vec<u8>,
    pub window: PageWindow,
    pub source_pages: u32,
    pub report: ComposeReport,
}

/// Parses `source`, checks the requested window against the document and
/// returns the watermarked window.
pub fn render_pdf(
    source: &[u8],
    requested: Option<(i64, i64)>,
    raster: &WatermarkRaster,
    config: &RenderConfig,
) -> Result<PdfRendering, RenderError> {
    let document = Document::load_mem(source)
        .map_err(|e| RenderError::Processing(format!("Failed to parse PDF: {}", e)))?;
    if document.is_encrypted() {
        return Err(RenderError::Processing(
            "Encrypted PDFs are not supported".to_string(),
        ));
    }

    let source_pages = u32::try_from(document.get_pages().len())
        .map_err(|_| RenderError::Processing("PDF page count out of range".to_string()))?;
    let window = resolve_window(requested, source_pages, source.len() as u64, config)?;

    let ExtractedDocument {
        document: mut extracted,
        page_ids,
        window,
    } = extract_pages(&document, window)?;
    drop(document);

    let report = compose_watermark(&mut extracted, &page_ids, raster, config)?;
    let bytes = save_document(&mut extracted)?;

    tracing::info!(
        source_pages,
        start = window.start,
        end = window.end,
        pages = report.pages,
        tiles = report.tiles,
        skipped_tiles = report.skipped.len(),
        bytes = bytes.len(),
        "Rendered PDF window"
    );

    Ok(PdfRendering {
        bytes,
        window,
        source_pages,
        report,
    })
}
