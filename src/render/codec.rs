//! Raster decode and encode.
//!
//! Watermarked images are re-encoded in the format they arrived in, so the
//! Content-Type always describes the bytes actually sent:
//! - JPEG at the configured quality (alpha dropped)
//! - PNG
//! - WebP, lossless (the `image` crate has no lossy WebP encoder)
//! - GIF, first frame only

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::watermark::WatermarkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    pub fn from_extension(key: &str) -> Option<Self> {
        let (_, extension) = key.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            "gif" => Some(OutputFormat::Gif),
            _ => None,
        }
    }

    /// Format sniffed from the bytes, else the key's extension, else JPEG.
    pub fn for_source(bytes: &[u8], key: &str) -> Self {
        image::guess_format(bytes)
            .ok()
            .and_then(Self::from_image_format)
            .or_else(|| Self::from_extension(key))
            .unwrap_or(OutputFormat::Jpeg)
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

impl EncodedImage {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Decodes any supported raster, sniffing the format from the bytes.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, WatermarkError> {
    let reader = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| WatermarkError::Decode(e.to_string()))?;
    let image = reader
        .decode()
        .map_err(|e| WatermarkError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

pub fn encode_image(
    image: &RgbaImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<EncodedImage, WatermarkError> {
    use image::ImageEncoder as _;

    let (width, height) = image.dimensions();
    let data = image.as_raw();
    let encode_failed =
        |e: image::ImageError| WatermarkError::Encode(format!("{}: {}", format.as_str(), e));

    let mut output = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = rgba_to_rgb(data);
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, jpeg_quality.clamp(1, 100))
                .write_image(&rgb, width, height, image::ColorType::Rgb8)
                .map_err(encode_failed)?;
        }
        OutputFormat::Png => {
            image::codecs::png::PngEncoder::new(&mut output)
                .write_image(data, width, height, image::ColorType::Rgba8)
                .map_err(encode_failed)?;
        }
        OutputFormat::WebP => {
            image::codecs::webp::WebPEncoder::new_lossless(&mut output)
                .write_image(data, width, height, image::ColorType::Rgba8)
                .map_err(encode_failed)?;
        }
        OutputFormat::Gif => {
            // The GIF trailer is written when the encoder drops
            let mut encoder = image::codecs::gif::GifEncoder::new(&mut output);
            encoder
                .encode(data, width, height, image::ColorType::Rgba8)
                .map_err(encode_failed)?;
        }
    }

    Ok(EncodedImage { data: output, format })
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}
