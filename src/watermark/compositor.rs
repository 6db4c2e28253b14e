//! Pixel compositor for tiling a watermark across an image.
//!
//! Tiles are blended one at a time with the Porter-Duff "over" operator.
//! A tile that fails to composite is recorded and skipped; the remaining
//! tiles still land. The result of a pass is a [`TileReport`] listing the
//! grid cells that were skipped.

use super::position::{calculate_raster_tiles, ImageDimensions, Tile, WatermarkDimensions};
use super::WatermarkError;
use image::{Rgba, RgbaImage};

/// A watermark image together with the opacity it is drawn at.
#[derive(Clone)]
pub struct WatermarkLayer {
    pub image: RgbaImage,
    /// Multiplied into the image's own alpha channel (0.0 to 1.0).
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("opacity", &self.opacity)
            .finish()
    }
}

/// Outcome of a tiling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileReport {
    pub composited: usize,
    /// `(column, row)` of every tile that could not be composited
    pub skipped: Vec<(u32, u32)>,
}

impl TileReport {
    pub fn total(&self) -> usize {
        self.composited + self.skipped.len()
    }

    /// True when tiles were attempted and none of them landed.
    pub fn all_failed(&self) -> bool {
        self.composited == 0 && !self.skipped.is_empty()
    }
}

/// Tile `layer` across `target` on the raster grid.
pub fn composite_tiled(
    target: &mut RgbaImage,
    layer: &WatermarkLayer,
    offset_fraction: f32,
) -> TileReport {
    calculate_raster_tiles(
        &ImageDimensions {
            width: target.width(),
            height: target.height(),
        },
        &WatermarkDimensions {
            width: layer.image.width(),
            height: layer.image.height(),
        },
        offset_fraction,
    )
    .fold(TileReport::default(), |mut report, tile| {
        match blend_tile(target, layer, &tile) {
            Ok(()) => report.composited += 1,
            Err(e) => {
                tracing::debug!(column = tile.column, row = tile.row, error = %e, "Skipping watermark tile");
                report.skipped.push((tile.column, tile.row));
            }
        }
        report
    })
}

/// Blend one tile onto the target, clamped to the target bounds.
fn blend_tile(target: &mut RgbaImage, layer: &WatermarkLayer, tile: &Tile) -> Result<(), WatermarkError> {
    let wm_width = i32::try_from(layer.image.width())
        .map_err(|_| WatermarkError::Composite("watermark too wide".to_string()))?;
    let wm_height = i32::try_from(layer.image.height())
        .map_err(|_| WatermarkError::Composite("watermark too tall".to_string()))?;
    let target_width = i32::try_from(target.width())
        .map_err(|_| WatermarkError::Composite("canvas too wide".to_string()))?;
    let target_height = i32::try_from(target.height())
        .map_err(|_| WatermarkError::Composite("canvas too tall".to_string()))?;

    let origin = tile.position;
    let right = origin.x.checked_add(wm_width).ok_or_else(|| {
        WatermarkError::Composite(format!("tile ({}, {}) overflows", tile.column, tile.row))
    })?;
    let bottom = origin.y.checked_add(wm_height).ok_or_else(|| {
        WatermarkError::Composite(format!("tile ({}, {}) overflows", tile.column, tile.row))
    })?;

    let x_start = origin.x.max(0);
    let y_start = origin.y.max(0);
    let x_end = right.min(target_width);
    let y_end = bottom.min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wm_pixel = *layer
                .image
                .get_pixel((tx - origin.x) as u32, (ty - origin.y) as u32);
            let target_pixel = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(
                tx as u32,
                ty as u32,
                blend_pixels(target_pixel, wm_pixel, layer.opacity),
            );
        }
    }

    Ok(())
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
pub(crate) fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
