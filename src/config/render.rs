//! Render ceilings and compositing factors.
//!
//! The page ceilings come in two flavours: `max_document_pages` bounds a
//! request without a page window, the `max_window_pages*` pair bounds an
//! explicit window. The two are independent, so a window ceiling may be
//! larger than the document ceiling.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_JPEG_QUALITY, DEFAULT_LARGE_SOURCE_BYTES, DEFAULT_MAX_DOCUMENT_PAGES,
    DEFAULT_MAX_OBJECT_BYTES, DEFAULT_MAX_WINDOW_PAGES, DEFAULT_MAX_WINDOW_PAGES_LARGE_SOURCE,
    DEFAULT_PDF_OPACITY, DEFAULT_PDF_SCALE, DEFAULT_PDF_TILE_SPACING,
    DEFAULT_PROGRESS_INTERVAL_PAGES, DEFAULT_RASTER_OPACITY, DEFAULT_RASTER_TILE_OFFSET_FRACTION,
};

fn default_max_object_bytes() -> u64 {
    DEFAULT_MAX_OBJECT_BYTES
}
fn default_max_document_pages() -> u32 {
    DEFAULT_MAX_DOCUMENT_PAGES
}
fn default_max_window_pages() -> u32 {
    DEFAULT_MAX_WINDOW_PAGES
}
fn default_max_window_pages_large_source() -> u32 {
    DEFAULT_MAX_WINDOW_PAGES_LARGE_SOURCE
}
fn default_large_source_bytes() -> u64 {
    DEFAULT_LARGE_SOURCE_BYTES
}
fn default_raster_opacity() -> f32 {
    DEFAULT_RASTER_OPACITY
}
fn default_raster_tile_offset() -> f32 {
    DEFAULT_RASTER_TILE_OFFSET_FRACTION
}
fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}
fn default_pdf_opacity() -> f32 {
    DEFAULT_PDF_OPACITY
}
fn default_pdf_scale() -> f32 {
    DEFAULT_PDF_SCALE
}
fn default_pdf_tile_spacing() -> f32 {
    DEFAULT_PDF_TILE_SPACING
}
fn default_progress_interval() -> u32 {
    DEFAULT_PROGRESS_INTERVAL_PAGES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: u64,
    #[serde(default = "default_max_document_pages")]
    pub max_document_pages: u32,
    #[serde(default = "default_max_window_pages")]
    pub max_window_pages: u32,
    #[serde(default = "default_max_window_pages_large_source")]
    pub max_window_pages_large_source: u32,
    #[serde(default = "default_large_source_bytes")]
    pub large_source_bytes: u64,
    #[serde(default = "default_raster_opacity")]
    pub raster_opacity: f32,
    /// Fraction of a tile the raster grid starts above/left of the canvas
    #[serde(default = "default_raster_tile_offset")]
    pub raster_tile_offset: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_pdf_opacity")]
    pub pdf_opacity: f32,
    #[serde(default = "default_pdf_scale")]
    pub pdf_scale: f32,
    #[serde(default = "default_pdf_tile_spacing")]
    pub pdf_tile_spacing: f32,
    #[serde(default = "default_progress_interval")]
    pub progress_interval_pages: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_object_bytes: default_max_object_bytes(),
            max_document_pages: default_max_document_pages(),
            max_window_pages: default_max_window_pages(),
            max_window_pages_large_source: default_max_window_pages_large_source(),
            large_source_bytes: default_large_source_bytes(),
            raster_opacity: default_raster_opacity(),
            raster_tile_offset: default_raster_tile_offset(),
            jpeg_quality: default_jpeg_quality(),
            pdf_opacity: default_pdf_opacity(),
            pdf_scale: default_pdf_scale(),
            pdf_tile_spacing: default_pdf_tile_spacing(),
            progress_interval_pages: default_progress_interval(),
        }
    }
}

impl RenderConfig {
    /// Page ceiling for an explicit window over a source of `source_bytes`
    pub fn window_ceiling(&self, source_bytes: u64) -> u32 {
        if source_bytes > self.large_source_bytes {
            self.max_window_pages_large_source
        } else {
            self.max_window_pages
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_object_bytes == 0 {
            return Err("render.max_object_bytes must be > 0".to_string());
        }
        if self.max_document_pages == 0
            || self.max_window_pages == 0
            || self.max_window_pages_large_source == 0
        {
            return Err("render page ceilings must be > 0".to_string());
        }
        for (name, value) in [
            ("render.raster_opacity", self.raster_opacity),
            ("render.pdf_opacity", self.pdf_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0, got {}", name, value));
            }
        }
        if !(0.0..1.0).contains(&self.raster_tile_offset) {
            return Err(format!(
                "render.raster_tile_offset must be in [0.0, 1.0), got {}",
                self.raster_tile_offset
            ));
        }
        if !(self.pdf_scale.is_finite() && self.pdf_scale > 0.0) {
            return Err(format!("render.pdf_scale must be > 0, got {}", self.pdf_scale));
        }
        if !(self.pdf_tile_spacing.is_finite() && self.pdf_tile_spacing >= 0.0) {
            return Err(format!(
                "render.pdf_tile_spacing must be finite and >= 0, got {}",
                self.pdf_tile_spacing
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "render.jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }
        if self.progress_interval_pages == 0 {
            return Err("render.progress_interval_pages must be > 0".to_string());
        }
        Ok(())
    }
}
