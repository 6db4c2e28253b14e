//! Watermark asset provider.
//!
//! Produces the raster tiled onto outputs. A caller-supplied raster (base64,
//! optionally data-URL prefixed) is preferred, since the client can render
//! scripts and fonts the server cannot. If none is supplied, or it does not
//! decode, the configured template lines are rendered with the embedded font.
//! If even that fails a plain tinted block is used, so the provider always
//! returns a non-empty raster.

use base64::Engine;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

use super::template::{ascii_safe, resolve_template, truncate_chars, TemplateContext};
use super::text_renderer::{parse_hex_color, render_text, Color, TextRenderOptions};
use super::WatermarkError;
use crate::config::WatermarkConfig;
use crate::constants::{MAX_FALLBACK_LINE_CHARS, MIN_RASTER_TILE_PX};

/// Size of the last-resort block raster
const BLOCK_WIDTH: u32 = 160;
const BLOCK_HEIGHT: u32 = 40;

/// How the raster was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterOrigin {
    Supplied,
    Synthesized,
    Block,
}

impl RasterOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterOrigin::Supplied => "supplied",
            RasterOrigin::Synthesized => "synthesized",
            RasterOrigin::Block => "block",
        }
    }
}

/// A decoded watermark bitmap, consumed opaquely by the compositors.
#[derive(Debug, Clone)]
pub struct WatermarkRaster {
    pub image: RgbaImage,
    pub origin: RasterOrigin,
}

impl WatermarkRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA8 pixel data, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// The bitmap with each edge stretched to at least `min_edge` pixels.
    pub fn with_min_edge(&self, min_edge: u32) -> RgbaImage {
        let (width, height) = (self.width().max(min_edge), self.height().max(min_edge));
        if (width, height) == self.image.dimensions() {
            return self.image.clone();
        }
        image::imageops::resize(&self.image, width, height, FilterType::Nearest)
    }

    /// Bitmap used for tiling raster images.
    pub fn raster_tile(&self) -> RgbaImage {
        self.with_min_edge(MIN_RASTER_TILE_PX)
    }
}

pub struct WatermarkProvider {
    config: WatermarkConfig,
    color: Color,
}

impl WatermarkProvider {
    pub fn new(config: WatermarkConfig) -> Result<Self, WatermarkError> {
        let color = parse_hex_color(&config.color)?;
        Ok(Self { config, color })
    }

    /// Default watermark text for requests that carry none.
    pub fn default_text(&self) -> &str {
        &self.config.default_text
    }

    /// Returns the raster to tile, never failing.
    pub fn provide(&self, supplied: Option<&str>, context: &TemplateContext) -> WatermarkRaster {
        if let Some(data) = supplied.filter(|d| !d.trim().is_empty()) {
            match decode_supplied(data) {
                Ok(image) => {
                    return WatermarkRaster {
                        image,
                        origin: RasterOrigin::Supplied,
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Caller-supplied watermark raster unusable, synthesizing from text");
                }
            }
        }

        match self.synthesize(context) {
            Ok(image) => WatermarkRaster {
                image,
                origin: RasterOrigin::Synthesized,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Fallback text rendering failed, using block watermark");
                WatermarkRaster {
                    image: self.block(),
                    origin: RasterOrigin::Block,
                }
            }
        }
    }

    /// Renders the configured template lines, ASCII-sanitized.
    pub fn synthesize(&self, context: &TemplateContext) -> Result<RgbaImage, WatermarkError> {
        let lines: Vec<String> = self
            .config
            .lines
            .iter()
            .map(|line| {
                let resolved = resolve_template(line, context);
                ascii_safe(&truncate_chars(resolved.trim(), MAX_FALLBACK_LINE_CHARS))
            })
            .filter(|line| !line.is_empty())
            .collect();

        render_text(&TextRenderOptions {
            lines,
            font_size: self.config.font_size,
            color: self.color,
            opacity: 1.0,
        })
    }

    fn block(&self) -> RgbaImage {
        RgbaImage::from_pixel(
            BLOCK_WIDTH,
            BLOCK_HEIGHT,
            Rgba([self.color.r, self.color.g, self.color.b, 96]),
        )
    }
}

/// Decodes a base64 raster, accepting a `data:image/...;base64,` prefix and
/// embedded whitespace.
pub fn decode_supplied(data: &str) -> Result<RgbaImage, WatermarkError> {
    let payload = match data.trim().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, payload)| payload)
            .ok_or_else(|| WatermarkError::Decode("data URL has no payload".to_string()))?,
        None => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| WatermarkError::Decode(format!("invalid base64: {}", e)))?;

    let image = image::load_from_memory(&bytes)
        .map_err(|e| WatermarkError::Decode(e.to_string()))?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkError::Decode(
            "watermark image has no pixels".to_string(),
        ));
    }
    Ok(image)
}
