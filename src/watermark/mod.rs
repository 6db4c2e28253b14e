//! Watermark raster production and pixel compositing.
//!
//! # Features
//!
//! - **Caller rasters**: base64 (optionally data-URL) images decoded as-is
//! - **Fallback synthesis**: template lines rendered with an embedded font
//! - **Tiled compositing**: Porter-Duff blending with per-tile failure isolation
//! - **Grid geometry** shared by the raster and PDF compositors
//!
//! # Template Variables
//!
//! Fallback lines support `{{user}}`, `{{text}}`, `{{ip}}`, `{{bucket}}`,
//! `{{file}}`, `{{date}}`, `{{datetime}}` and `{{timestamp}}`.

pub mod compositor;
pub mod error;
pub mod position;
pub mod provider;
pub mod template;
pub mod text_renderer;

pub use compositor::{composite_tiled, TileReport, WatermarkLayer};
pub use error::WatermarkError;
pub use position::{
    calculate_page_tiles, calculate_raster_tiles, raster_grid_size, ImageDimensions, PageRect,
    PlacementPosition, Tile, WatermarkDimensions,
};
pub use provider::{decode_supplied, RasterOrigin, WatermarkProvider, WatermarkRaster};
pub use template::{ascii_safe, resolve_template, TemplateContext};
pub use text_renderer::{measure_text, parse_hex_color, render_text, Color, TextRenderOptions};
