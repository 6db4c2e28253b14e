//! Fallback watermark synthesis settings.
//!
//! Used only when the caller does not supply a pre-rendered raster (or the
//! supplied one fails to decode). Each entry of `lines` is a template
//! rendered into one line of text; see `watermark::template` for the
//! available variables.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FALLBACK_FONT_SIZE, DEFAULT_WATERMARK_TEXT};

fn default_text() -> String {
    DEFAULT_WATERMARK_TEXT.to_string()
}

fn default_font_size() -> f32 {
    DEFAULT_FALLBACK_FONT_SIZE
}

fn default_color() -> String {
    "#5A5A5A".to_string()
}

fn default_lines() -> Vec<String> {
    vec![
        "{{text}}".to_string(),
        "{{user}} {{ip}}".to_string(),
        "{{datetime}}".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Watermark text used when the request carries none
    #[serde(default = "default_text")]
    pub default_text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Hex color of the fallback text (#RGB or #RRGGBB)
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_lines")]
    pub lines: Vec<String>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            default_text: default_text(),
            font_size: default_font_size(),
            color: default_color(),
            lines: default_lines(),
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(format!(
                "watermark.font_size must be > 0, got {}",
                self.font_size
            ));
        }
        crate::watermark::parse_hex_color(&self.color)
            .map_err(|e| format!("watermark.color: {}", e))?;
        if self.lines.iter().all(|line| line.trim().is_empty()) {
            return Err("watermark.lines must contain at least one non-empty line".to_string());
        }
        Ok(())
    }
}
