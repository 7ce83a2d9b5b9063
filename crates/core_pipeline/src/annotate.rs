//! Debug image annotation
//!
//! Draws every kept detection onto a copy of the source image: a closed
//! green outline around the region and the recognized text in red just
//! above the first vertex.

use crate::types::Detection;
use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use std::path::{Path, PathBuf};

pub const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const OUTLINE_THICKNESS: i32 = 2;
const LABEL_OFFSET: f32 = 10.0;
const LABEL_SCALE: f32 = 18.0;

/// Fonts tried when no label font is configured
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load the label font from `configured`, or the first system font found
///
/// Returns `None` when nothing loads; annotation then draws outlines only.
pub fn load_label_font(configured: Option<&Path>) -> Option<FontVec> {
    let candidates: Vec<PathBuf> = match configured {
        Some(path) => vec![path.to_path_buf()],
        None => FALLBACK_FONTS.iter().map(PathBuf::from).collect(),
    };

    for path in &candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                tracing::info!(font = %path.display(), "Loaded label font");
                return Some(font);
            }
            Err(e) => tracing::warn!(font = %path.display(), "Unusable font: {}", e),
        }
    }

    tracing::warn!("No label font available; debug images will show outlines only");
    None
}

/// Draw a closed outline through the four vertices of `detection`
///
/// Each edge is stroked `OUTLINE_THICKNESS` times, stepping one pixel along
/// the edge's normal, so diagonal edges get the same width as straight ones.
fn draw_outline(canvas: &mut RgbImage, detection: &Detection) {
    let quad = &detection.bbox;
    for i in 0..quad.len() {
        let start = quad[i];
        let end = quad[(i + 1) % quad.len()];
        let (dx, dy) = (end.x - start.x, end.y - start.y);
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if len > 0.0 {
            (-dy / len, dx / len)
        } else {
            (0.0, 0.0)
        };

        for step in 0..OUTLINE_THICKNESS {
            let d = step as f32;
            draw_line_segment_mut(
                canvas,
                (start.x + nx * d, start.y + ny * d),
                (end.x + nx * d, end.y + ny * d),
                OUTLINE_COLOR,
            );
        }
    }
}

/// Top edge of a label whose baseline sits `LABEL_OFFSET` above `anchor_y`
fn label_top(anchor_y: f32) -> i32 {
    (anchor_y - LABEL_OFFSET - LABEL_SCALE).round() as i32
}

/// Copy `image` and draw every detection on it
pub fn annotate(image: &DynamicImage, detections: &[Detection], font: Option<&FontVec>) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for detection in detections {
        draw_outline(&mut canvas, detection);

        if let Some(font) = font {
            let anchor = detection.bbox[0];
            draw_text_mut(
                &mut canvas,
                LABEL_COLOR,
                anchor.x.round() as i32,
                label_top(anchor.y),
                PxScale::from(LABEL_SCALE),
                font,
                &detection.text,
            );
        }
    }

    canvas
}
