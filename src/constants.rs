// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Ceilings and rendering factors live here so config defaults, validation
// and tests all agree on the same numbers.

// =============================================================================
// Server defaults
// =============================================================================

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default maximum request body size (8 MB, caller rasters travel as base64)
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Default path of the render endpoint
pub const DEFAULT_RENDER_PATH: &str = "/watermark";

/// Default value of the Access-Control-Allow-Origin header
pub const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";

// =============================================================================
// Storage defaults
// =============================================================================

/// Default S3 operation timeout in seconds
pub const DEFAULT_S3_TIMEOUT_SECS: u64 = 20;

/// Content type reported for passthrough objects the store declares nothing for
pub const DEFAULT_PASSTHROUGH_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Identity defaults
// =============================================================================

/// Caller-supplied username value meaning "not set"
pub const SENTINEL_USERNAME: &str = "USER";

/// Display name used when no identity can be resolved
pub const SENTINEL_IDENTITY: &str = "CONFIDENTIAL";

/// Default identity directory request timeout in milliseconds
pub const DEFAULT_DIRECTORY_TIMEOUT_MS: u64 = 3000;

// =============================================================================
// Render ceilings
// =============================================================================

/// Maximum source object size accepted for rendering (50 MB)
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum page count of a document rendered without an explicit window
pub const DEFAULT_MAX_DOCUMENT_PAGES: u32 = 200;

/// Maximum pages per explicit window for ordinary sources
pub const DEFAULT_MAX_WINDOW_PAGES: u32 = 50;

/// Maximum pages per explicit window once the source exceeds the large-source threshold
pub const DEFAULT_MAX_WINDOW_PAGES_LARGE_SOURCE: u32 = 30;

/// Source size above which the reduced window ceiling applies (20 MB)
pub const DEFAULT_LARGE_SOURCE_BYTES: u64 = 20 * 1024 * 1024;

// =============================================================================
// Watermark rendering defaults
// =============================================================================

/// Default watermark text when the caller supplies none
pub const DEFAULT_WATERMARK_TEXT: &str = "CONFIDENTIAL";

/// Opacity applied to the watermark layer on raster images
pub const DEFAULT_RASTER_OPACITY: f32 = 0.2;

/// JPEG quality used when re-encoding watermarked images
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Fraction of a tile the raster grid is shifted up/left by
pub const DEFAULT_RASTER_TILE_OFFSET_FRACTION: f32 = 0.25;

/// Opacity applied to watermark tiles drawn on PDF pages
pub const DEFAULT_PDF_OPACITY: f32 = 0.15;

/// Scale applied to the raster's native size when drawn on PDF pages
pub const DEFAULT_PDF_SCALE: f32 = 0.5;

/// Spacing in PDF user-space units between adjacent tiles
pub const DEFAULT_PDF_TILE_SPACING: f32 = 1.0;

/// Pages processed between progress checkpoints
pub const DEFAULT_PROGRESS_INTERVAL_PAGES: u32 = 10;

/// Font size in pixels for the synthesized fallback raster
pub const DEFAULT_FALLBACK_FONT_SIZE: f32 = 20.0;

// =============================================================================
// Watermark resource bounds
// =============================================================================

/// Characters kept from any single template value (user, text, file...)
pub const MAX_TEMPLATE_VALUE_CHARS: usize = 128;

/// Characters kept from a resolved fallback line
pub const MAX_FALLBACK_LINE_CHARS: usize = 256;

/// Largest fallback text canvas; anything bigger falls back to the block raster
pub const MAX_FALLBACK_CANVAS_WIDTH: u32 = 4096;
pub const MAX_FALLBACK_CANVAS_HEIGHT: u32 = 512;

/// Smallest watermark tile edge on raster images, in pixels
pub const MIN_RASTER_TILE_PX: u32 = 32;

/// Smallest watermark tile edge on PDF pages, in points
pub const MIN_PAGE_TILE_PT: f32 = 16.0;

/// Most tiles drawn on a single PDF page; larger pages get a wider step
pub const MAX_TILES_PER_PAGE: u32 = 4096;
