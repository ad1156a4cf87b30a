//! Export — board snapshot as a JSON document or a rasterized PNG.
//!
//! The PNG path is a plain software rasterizer: each element is painted in
//! paint order as a filled, rotation-aware rectangle (or ellipse for circle
//! shapes) over a white canvas covering the content bounds plus padding.
//! Text, media, and strokes are not drawn.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use wire::{BoardId, Content, Element, ElementKind, ShapeKind};

use crate::camera::{Bounds, Point};
use crate::consts::{EXPORT_FORMAT, EXPORT_PADDING, EXPORT_VERSION, MAX_EXPORT_SIDE_PX};
use crate::doc::DocStore;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("board has no elements to export")]
    EmptyBoard,
    #[error("image would be {width}x{height} px; the limit is {max} px per side", max = MAX_EXPORT_SIDE_PX)]
    TooLarge { width: f64, height: f64 },
    #[error("pixel ratio must be positive and finite, got {0}")]
    InvalidPixelRatio(f64),
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("json encoding failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Self-describing snapshot of a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub format: String,
    pub version: u32,
    pub board_id: BoardId,
    /// Milliseconds since the Unix epoch.
    pub exported_at: i64,
    /// Union of element bounds; absent for an empty board.
    pub bounds: Option<Bounds>,
    /// Paint order.
    pub elements: Vec<Element>,
}

/// Build the export document for `doc`.
#[must_use]
pub fn export_document(doc: &DocStore, board_id: BoardId, exported_at: i64) -> BoardDocument {
    BoardDocument {
        format: EXPORT_FORMAT.to_owned(),
        version: EXPORT_VERSION,
        board_id,
        exported_at,
        bounds: doc.bounds(),
        elements: doc.sorted_elements().into_iter().cloned().collect(),
    }
}

/// Pretty-printed JSON of `document`.
///
/// # Errors
///
/// Returns `Serialize` if serde_json fails.
pub fn to_json(document: &BoardDocument) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Rasterize `doc` to PNG bytes at `pixel_ratio` device pixels per board unit.
///
/// # Errors
///
/// Returns `EmptyBoard`, `InvalidPixelRatio`, `TooLarge` when either side
/// would exceed `MAX_EXPORT_SIDE_PX`, or `Encode` if PNG encoding fails.
pub fn export_png(doc: &DocStore, pixel_ratio: f64) -> Result<Vec<u8>, ExportError> {
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
        return Err(ExportError::InvalidPixelRatio(pixel_ratio));
    }
    let area = doc.bounds().ok_or(ExportError::EmptyBoard)?.inflate(EXPORT_PADDING);
    let (width, height) = canvas_size(&area, pixel_ratio)?;

    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);
    for el in doc.sorted_elements() {
        paint(&mut img, el, &area, pixel_ratio);
    }

    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn canvas_size(area: &Bounds, pixel_ratio: f64) -> Result<(u32, u32), ExportError> {
    let width = (area.width * pixel_ratio).ceil().max(1.0);
    let height = (area.height * pixel_ratio).ceil().max(1.0);
    let limit = f64::from(MAX_EXPORT_SIDE_PX);
    if width > limit || height > limit {
        return Err(ExportError::TooLarge { width, height });
    }
    Ok((width as u32, height as u32))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn paint(img: &mut RgbaImage, el: &Element, area: &Bounds, ratio: f64) {
    let [r, g, b] = fill_color(el);
    let alpha = el.style.opacity().clamp(0.0, 1.0);
    let ellipse = matches!(el.content, Content::Shape { shape: ShapeKind::Circle });
    let local = Bounds::of(el);
    let center = local.center();

    // Scan only the pixels under the rotated box.
    let reach = Bounds::rotated(el);
    let x0 = ((reach.x - area.x) * ratio).floor().max(0.0) as u32;
    let y0 = ((reach.y - area.y) * ratio).floor().max(0.0) as u32;
    let x1 = (((reach.right() - area.x) * ratio).ceil().max(0.0) as u32).min(img.width());
    let y1 = (((reach.bottom() - area.y) * ratio).ceil().max(0.0) as u32).min(img.height());

    for py in y0..y1 {
        for px in x0..x1 {
            let world = Point::new(
                area.x + (f64::from(px) + 0.5) / ratio,
                area.y + (f64::from(py) + 0.5) / ratio,
            );
            let p = world.rotated_about(center, -el.rotation);
            let inside = if ellipse {
                let nx = (p.x - center.x) / (local.width / 2.0);
                let ny = (p.y - center.y) / (local.height / 2.0);
                nx * nx + ny * ny <= 1.0
            } else {
                local.contains(p)
            };
            if inside {
                let dst = img.get_pixel_mut(px, py);
                dst.0 = [blend(r, dst.0[0], alpha), blend(g, dst.0[1], alpha), blend(b, dst.0[2], alpha), 255];
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn blend(src: u8, dst: u8, alpha: f64) -> u8 {
    (f64::from(src) * alpha + f64::from(dst) * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8
}

fn fill_color(el: &Element) -> [u8; 3] {
    el.style.fill.as_deref().and_then(parse_hex).unwrap_or_else(|| default_fill(el.kind))
}

fn default_fill(kind: ElementKind) -> [u8; 3] {
    match kind {
        ElementKind::Image | ElementKind::Video => [0xc9, 0xce, 0xd6],
        ElementKind::Text => [0xf3, 0xf4, 0xf6],
        ElementKind::Shape => [0x4f, 0x7c, 0xff],
        ElementKind::Sticky => [0xff, 0xe6, 0x6d],
        ElementKind::Frame => [0xee, 0xf0, 0xf3],
    }
}

/// `#rgb` or `#rrggbb`.
fn parse_hex(value: &str) -> Option<[u8; 3]> {
    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| match u8::from_str_radix(s, 16) {
        Ok(v) => Some(v),
        Err(_) => None,
    };
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = channel(&hex[i..=i])? * 17;
            }
            Some(out)
        }
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        _ => None,
    }
}
