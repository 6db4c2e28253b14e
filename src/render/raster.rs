//! Raster compositor: tile the watermark across an image and re-encode it.

use super::codec::{decode_image, encode_image, EncodedImage, OutputFormat};
use crate::config::RenderConfig;
use crate::watermark::{composite_tiled, TileReport, WatermarkError, WatermarkLayer, WatermarkRaster};

#[derive(Debug)]
pub struct RasterRendering {
    pub encoded: EncodedImage,
    pub width: u32,
    pub height: u32,
    pub report: TileReport,
}

/// Watermarks `source` (stored under `key`) and re-encodes it in its own
/// format.
///
/// Errors here are absorbed by the caller, which serves the original bytes
/// instead. A pass in which every tile failed counts as an error.
pub fn render_raster(
    source: &[u8],
    key: &str,
    raster: &WatermarkRaster,
    config: &RenderConfig,
) -> Result<RasterRendering, WatermarkError> {
    let format = OutputFormat::for_source(source, key);
    let mut canvas = decode_image(source)?;

    let layer = WatermarkLayer {
        image: raster.raster_tile(),
        opacity: config.raster_opacity,
    };
    let report = composite_tiled(&mut canvas, &layer, config.raster_tile_offset);
    if report.all_failed() {
        return Err(WatermarkError::Composite(format!(
            "all {} watermark tiles failed",
            report.total()
        )));
    }
    if !report.skipped.is_empty() {
        tracing::warn!(
            skipped_tiles = report.skipped.len(),
            tiles = report.total(),
            "Some watermark tiles could not be composited"
        );
    }

    let (width, height) = canvas.dimensions();
    let encoded = encode_image(&canvas, format, config.jpeg_quality)?;

    Ok(RasterRendering {
        encoded,
        width,
        height,
        report,
    })
}
