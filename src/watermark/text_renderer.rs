//! Text rendering for the fallback watermark raster.
//!
//! Lines are drawn with the embedded DejaVu Sans Mono font onto a
//! transparent canvas sized to fit them. Callers sanitize text to ASCII
//! first, since only glyphs the font covers are guaranteed to render.

use super::compositor::blend_pixels;
use super::WatermarkError;
use crate::constants::{MAX_FALLBACK_CANVAS_HEIGHT, MAX_FALLBACK_CANVAS_WIDTH};
use ab_glyph::{point, Font, FontRef, Glyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();

const FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Margin around the text block, in pixels
const MARGIN: u32 = 4;

fn font() -> Result<&'static FontRef<'static>, WatermarkError> {
    FONT.get_or_init(|| FontRef::try_from_slice(FONT_DATA).ok())
        .as_ref()
        .ok_or_else(|| WatermarkError::Render("embedded font failed to load".to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn with_alpha(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// Drawn top to bottom, left aligned; blank lines are dropped
    pub lines: Vec<String>,
    pub font_size: f32,
    pub color: Color,
    pub opacity: f32,
}

/// `#RGB` or `#RRGGBB`
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let invalid =
        || WatermarkError::Render(format!("invalid color '{}', expected #RGB or #RRGGBB", hex));

    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;

    match digits.len() {
        3 => {
            let nibble = |shift: u32| (((value >> shift) & 0xF) as u8) * 0x11;
            Ok(Color::new(nibble(8), nibble(4), nibble(0)))
        }
        6 => Ok(Color::new((value >> 16) as u8, (value >> 8) as u8, value as u8)),
        _ => Err(invalid()),
    }
}

/// Glyphs of one line positioned from `origin_x` along `baseline`, plus the
/// pen position after the last glyph.
fn layout_line<F: Font>(
    font: &F,
    scale: PxScale,
    text: &str,
    origin_x: f32,
    baseline: f32,
) -> (Vec<Glyph>, f32) {
    let scaled = font.as_scaled(scale);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut pen = origin_x;
    let mut previous = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(previous) = previous {
            pen += scaled.kern(previous, id);
        }
        glyphs.push(id.with_scale_and_position(scale, point(pen, baseline)));
        pen += scaled.h_advance(id);
        previous = Some(id);
    }
    (glyphs, pen)
}

/// Width and line height in pixels of a single line, without margin.
pub fn measure_text(text: &str, font_size: f32) -> Result<(u32, u32), WatermarkError> {
    let font = font()?;
    let scale = PxScale::from(font_size);
    let (_, advance) = layout_line(font, scale, text, 0.0, 0.0);
    Ok((
        advance.ceil() as u32,
        font.as_scaled(scale).height().ceil() as u32,
    ))
}

pub fn render_text(options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    let lines: Vec<&str> = options
        .lines
        .iter()
        .map(String::as_str)
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(WatermarkError::Render("no text to render".to_string()));
    }
    if options.font_size.is_nan() || options.font_size <= 0.0 {
        return Err(WatermarkError::Render(format!(
            "font size must be positive, got {}",
            options.font_size
        )));
    }

    let font = font()?;
    let scale = PxScale::from(options.font_size);
    let line_height = font.as_scaled(scale).height().ceil() as u32;
    let ascent = font.as_scaled(scale).ascent();

    let mut block_width = 0;
    for line in &lines {
        block_width = block_width.max(measure_text(line, options.font_size)?.0);
    }

    let width = block_width.saturating_add(MARGIN * 2).max(1);
    let height = line_height
        .saturating_mul(lines.len() as u32)
        .saturating_add(MARGIN * 2)
        .max(1);
    if width > MAX_FALLBACK_CANVAS_WIDTH || height > MAX_FALLBACK_CANVAS_HEIGHT {
        return Err(WatermarkError::Render(format!(
            "text canvas {}x{} exceeds {}x{}",
            width, height, MAX_FALLBACK_CANVAS_WIDTH, MAX_FALLBACK_CANVAS_HEIGHT
        )));
    }
    let mut canvas = RgbaImage::new(width, height);
    let alpha = options.opacity.clamp(0.0, 1.0) * 255.0;

    for (row, line) in lines.iter().enumerate() {
        let baseline = MARGIN as f32 + (row as u32 * line_height) as f32 + ascent;
        let (glyphs, _) = layout_line(font, scale, line, MARGIN as f32, baseline);

        for outlined in glyphs.into_iter().filter_map(|g| font.outline_glyph(g)) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i64 + i64::from(gx);
                let y = bounds.min.y as i64 + i64::from(gy);
                if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                let ink = options.color.with_alpha((coverage * alpha) as u8);
                let blended = blend_pixels(*canvas.get_pixel(x, y), ink, 1.0);
                canvas.put_pixel(x, y, blended);
            });
        }
    }

    Ok(canvas)
}
