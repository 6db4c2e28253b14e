//! Tiling the watermark raster onto extracted pages.
//!
//! The raster is embedded once as an image XObject (RGB plus a DeviceGray
//! soft mask for its alpha) together with one ExtGState carrying the fill
//! opacity. Each page then gets:
//!
//! - a leading `q` stream, so the original content cannot leak graphics
//!   state into the overlay
//! - its original content streams, untouched
//! - an overlay stream: `Q q /Gs gs` followed by one `q cm Do Q` per tile
//!
//! Page resources are cloned inline before the watermark names are added,
//! so resource dictionaries shared between pages are never mutated.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

use crate::config::RenderConfig;
use crate::constants::MIN_PAGE_TILE_PT;
use crate::error::RenderError;
use crate::watermark::{calculate_page_tiles, PageRect, WatermarkRaster};

const XOBJECT_NAME: &str = "InkmarkWm";
const GSTATE_NAME: &str = "InkmarkGs";

/// Handles to the watermark objects shared by every page
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedWatermark {
    pub image_id: ObjectId,
    pub gstate_id: ObjectId,
    /// Tile size in points, after scaling; never below `MIN_PAGE_TILE_PT`
    pub tile_width: f32,
    pub tile_height: f32,
}

/// Outcome of watermarking every page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeReport {
    pub pages: usize,
    pub tiles: usize,
    /// `(page, tile index)` of every tile that could not be drawn
    pub skipped: Vec<(u32, u32)>,
}

fn zlib(data: &[u8]) -> Result<Vec<u8>, RenderError> {
    let compress_failed =
        |e: std::io::Error| RenderError::Processing(format!("Failed to compress watermark image: {}", e));
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(compress_failed)?;
    encoder.finish().map_err(compress_failed)
}

/// Embeds the raster and its opacity state into `doc`.
pub fn embed_watermark(
    doc: &mut Document,
    raster: &WatermarkRaster,
    opacity: f32,
    scale: f32,
) -> Result<EmbeddedWatermark, RenderError> {
    let (width, height) = (raster.width(), raster.height());
    if width == 0 || height == 0 {
        return Err(RenderError::Processing("Watermark raster is empty".to_string()));
    }

    let pixels = raster.as_raw();
    let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
    let mut alpha = Vec::with_capacity(pixels.len() / 4);
    for px in pixels.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
        alpha.push(px[3]);
    }

    let mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        zlib(&alpha)?,
    )
    .with_compression(false);
    let mask_id = doc.add_object(mask);

    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => mask_id,
        },
        zlib(&rgb)?,
    )
    .with_compression(false);
    let image_id = doc.add_object(image);

    let gstate_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity.into()),
        "CA" => Object::Real(opacity.into()),
    });

    Ok(EmbeddedWatermark {
        image_id,
        gstate_id,
        tile_width: (width as f32 * scale).max(MIN_PAGE_TILE_PT),
        tile_height: (height as f32 * scale).max(MIN_PAGE_TILE_PT),
    })
}

/// Tiles the watermark onto every page in `page_ids`.
///
/// Individual tiles that cannot be encoded are skipped; a page whose
/// dictionary cannot be read fails the render.
pub fn compose_watermark(
    doc: &mut Document,
    page_ids: &[ObjectId],
    raster: &WatermarkRaster,
    config: &RenderConfig,
) -> Result<ComposeReport, RenderError> {
    let embedded = embed_watermark(doc, raster, config.pdf_opacity, config.pdf_scale)?;
    let interval = config.progress_interval_pages.max(1) as usize;

    let report = page_ids.iter().enumerate().try_fold(
        ComposeReport::default(),
        |mut report, (index, page_id)| {
            let page_number = index as u32 + 1;
            let (drawn, skipped) =
                watermark_page(doc, *page_id, page_number, &embedded, config.pdf_tile_spacing)?;
            report.pages += 1;
            report.tiles += drawn;
            report.skipped.extend(skipped.into_iter().map(|tile| (page_number, tile)));

            if report.pages % interval == 0 {
                tracing::debug!(
                    pages_done = report.pages,
                    pages_total = page_ids.len(),
                    "Watermarking progress"
                );
            }
            Ok::<_, RenderError>(report)
        },
    )?;

    if !report.skipped.is_empty() {
        tracing::warn!(
            skipped_tiles = report.skipped.len(),
            tiles = report.tiles,
            "Some watermark tiles could not be drawn"
        );
    }
    Ok(report)
}

/// Returns `(tiles drawn, indices of skipped tiles)`.
fn watermark_page(
    doc: &mut Document,
    page_id: ObjectId,
    page_number: u32,
    embedded: &EmbeddedWatermark,
    spacing: f32,
) -> Result<(usize, Vec<u32>), RenderError> {
    let page_error =
        |reason: String| RenderError::Processing(format!("Failed to watermark page {}: {}", page_number, reason));

    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| page_error(e.to_string()))?;

    let rect = media_box(doc, page).ok_or_else(|| page_error("unreadable MediaBox".to_string()))?;
    let mut resources = resolve_dictionary(doc, page.get(b"Resources").ok());
    let existing_contents = page.get(b"Contents").ok().cloned();

    let mut xobjects = resolve_dictionary(doc, resources.get(b"XObject").ok());
    let mut gstates = resolve_dictionary(doc, resources.get(b"ExtGState").ok());
    let xobject_name = unique_name(&xobjects, XOBJECT_NAME);
    let gstate_name = unique_name(&gstates, GSTATE_NAME);
    xobjects.set(xobject_name.clone(), embedded.image_id);
    gstates.set(gstate_name.clone(), embedded.gstate_id);
    resources.set("XObject", xobjects);
    resources.set("ExtGState", gstates);

    let positions = calculate_page_tiles(&rect, embedded.tile_width, embedded.tile_height, spacing);
    let (tiles, drawn, skipped) = positions.iter().enumerate().fold(
        (Vec::new(), 0usize, Vec::new()),
        |(mut ops, drawn, mut skipped), (index, (x, y))| {
            match tile_operations(&xobject_name, *x, *y, embedded.tile_width, embedded.tile_height) {
                Ok(encoded) => {
                    ops.extend_from_slice(&encoded);
                    (ops, drawn + 1, skipped)
                }
                Err(reason) => {
                    tracing::debug!(page = page_number, tile = index, reason = %reason, "Skipping watermark tile");
                    skipped.push(index as u32);
                    (ops, drawn, skipped)
                }
            }
        },
    );

    let header = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gstate_name)]),
        ],
    }
    .encode()
    .map_err(|e| page_error(e.to_string()))?;

    let mut overlay = header;
    overlay.extend_from_slice(&tiles);
    overlay.extend_from_slice(b"Q\n");

    let prefix_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = vec![Object::Reference(prefix_id)];
    match existing_contents {
        Some(Object::Reference(id)) => contents.push(Object::Reference(id)),
        Some(Object::Array(items)) => contents.extend(items),
        Some(Object::Stream(stream)) => contents.push(Object::Reference(doc.add_object(stream))),
        _ => {}
    }
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| page_error(e.to_string()))?;
    page.set("Resources", resources);
    page.set("Contents", contents);

    Ok((drawn, skipped))
}

/// `q w 0 0 h x y cm /Name Do Q` for one tile.
fn tile_operations(name: &[u8], x: f32, y: f32, width: f32, height: f32) -> Result<Vec<u8>, String> {
    if ![x, y, width, height].iter().all(|v| v.is_finite()) {
        return Err(format!("non-finite tile geometry at ({}, {})", x, y));
    }
    let real = |v: f32| Object::Real(v.into());
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
            ),
            Operation::new("Do", vec![Object::Name(name.to_vec())]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()
    .map_err(|e| e.to_string())
}

fn resolve<'d>(doc: &'d Document, object: &'d Object) -> &'d Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Owned copy of a (possibly indirect) dictionary, empty if absent.
fn resolve_dictionary(doc: &Document, object: Option<&Object>) -> Dictionary {
    object
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new)
}

fn number(doc: &Document, object: &Object) -> Option<f32> {
    match resolve(doc, object) {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

pub(crate) fn media_box(doc: &Document, page: &Dictionary) -> Option<PageRect> {
    let values = page
        .get(b"MediaBox")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())?;
    if values.len() != 4 {
        return None;
    }
    let coords: Vec<f32> = values.iter().map(|v| number(doc, v)).collect::<Option<_>>()?;
    let (llx, lly, urx, ury) = (coords[0], coords[1], coords[2], coords[3]);
    Some(PageRect {
        x: llx.min(urx),
        y: lly.min(ury),
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
    })
}

fn unique_name(existing: &Dictionary, base: &str) -> Vec<u8> {
    let mut name = base.as_bytes().to_vec();
    let mut suffix = 1;
    while existing.has(&name) {
        name = format!("{}{}", base, suffix).into_bytes();
        suffix += 1;
    }
    name
}

/// Serializes the finished document.
pub fn save_document(doc: &mut Document) -> Result<Vec<u8>, RenderError> {
    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::PdfSaveFailed(e.to_string()))?;
    Ok(bytes)
}
