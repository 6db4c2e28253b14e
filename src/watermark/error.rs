//! Watermark error types.
//!
//! These never reach the caller: the provider absorbs them by falling back
//! to text synthesis, and the raster compositor absorbs them by skipping
//! tiles or serving the original bytes.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatermarkError {
    /// Caller-supplied raster or source image could not be decoded
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Fallback text could not be drawn
    #[error("text rendering failed: {0}")]
    Render(String),

    /// A tile could not be placed on the canvas
    #[error("tile compositing failed: {0}")]
    Composite(String),

    /// The composited canvas could not be re-encoded
    #[error("image encode failed: {0}")]
    Encode(String),
}
