//! Tile placement geometry.
//!
//! Two grids are computed here:
//!
//! - **Raster grid**: `ceil(W/tw)+1` × `ceil(H/th)+1` tiles of exactly the
//!   watermark size, shifted up/left by a fraction of a tile so the pattern
//!   does not line up with the canvas edges. The extra row/column guarantees
//!   coverage of the partial edge tiles.
//! - **Page grid**: PDF user-space tiles stepping `tile + spacing` from the
//!   page origin until the page's width/height is covered. Pages that would
//!   need more than [`MAX_TILES_PER_PAGE`] tiles get a proportionally wider
//!   step instead.

use crate::constants::MAX_TILES_PER_PAGE;

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Pixel position of a tile's top-left corner; may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One cell of a tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub column: u32,
    pub row: u32,
    pub position: PlacementPosition,
}

/// Column and row counts of the raster grid for the given sizes.
///
/// Zero-sized watermarks produce an empty grid.
pub fn raster_grid_size(image: &ImageDimensions, watermark: &WatermarkDimensions) -> (u32, u32) {
    if watermark.width == 0 || watermark.height == 0 {
        return (0, 0);
    }
    (
        image.width.div_ceil(watermark.width) + 1,
        image.height.div_ceil(watermark.height) + 1,
    )
}

/// Tiles covering `image`, row-major, starting `offset_fraction` of a tile
/// above and left of the canvas origin. Tiles are produced on demand.
pub fn calculate_raster_tiles(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    offset_fraction: f32,
) -> impl Iterator<Item = Tile> {
    let (columns, rows) = raster_grid_size(image, watermark);
    let watermark = *watermark;
    let offset_x = (watermark.width as f32 * offset_fraction.clamp(0.0, 1.0)) as i64;
    let offset_y = (watermark.height as f32 * offset_fraction.clamp(0.0, 1.0)) as i64;

    (0..rows)
        .flat_map(move |row| (0..columns).map(move |column| (column, row)))
        .map(move |(column, row)| {
            let x = column as i64 * watermark.width as i64 - offset_x;
            let y = row as i64 * watermark.height as i64 - offset_y;
            Tile {
                column,
                row,
                position: PlacementPosition::new(
                    x.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                    y.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                ),
            }
        })
}

/// A page box in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

fn page_grid_size(page: &PageRect, step_x: f32, step_y: f32) -> (u32, u32) {
    (
        (page.width / step_x).ceil() as u32,
        (page.height / step_y).ceil() as u32,
    )
}

/// Lower-left corners of tiles covering `page`, starting at its origin.
///
/// Returns nothing for degenerate tiles or pages.
pub fn calculate_page_tiles(
    page: &PageRect,
    tile_width: f32,
    tile_height: f32,
    spacing: f32,
) -> Vec<(f32, f32)> {
    let mut step_x = tile_width + spacing;
    let mut step_y = tile_height + spacing;
    let usable = |v: f32| v.is_finite() && v > 0.0;
    if !(usable(step_x) && usable(step_y) && usable(page.width) && usable(page.height)) {
        return Vec::new();
    }

    let (mut columns, mut rows) = page_grid_size(page, step_x, step_y);
    let count = u64::from(columns) * u64::from(rows);
    if count > u64::from(MAX_TILES_PER_PAGE) {
        let widen = (count as f32 / MAX_TILES_PER_PAGE as f32).sqrt();
        step_x *= widen;
        step_y *= widen;
        (columns, rows) = page_grid_size(page, step_x, step_y);
        while u64::from(columns) * u64::from(rows) > u64::from(MAX_TILES_PER_PAGE) {
            step_x *= 1.05;
            step_y *= 1.05;
            (columns, rows) = page_grid_size(page, step_x, step_y);
        }
    }

    (0..rows)
        .flat_map(|row| (0..columns).map(move |column| (column, row)))
        .map(|(column, row)| {
            (
                page.x + column as f32 * step_x,
                page.y + row as f32 * step_y,
            )
        })
        .collect()
}
