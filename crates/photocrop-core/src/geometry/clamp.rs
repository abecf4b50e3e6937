//! Enforcement of the crop rectangle invariants.
//!
//! After every mutation a rectangle must satisfy, in bitmap pixels:
//!
//! - `x >= 0`, `y >= 0`
//! - `x + w <= width`, `y + h <= height`
//! - `w >= min_size`, `h >= min_size`
//!
//! The last two cannot hold on an axis where the image itself is smaller than
//! `min_size`; there the rectangle is pinned to the full extent of that axis
//! and [`is_confirmable`] keeps the confirm action disabled.

use super::{ImageDimensions, Rect};

/// Slack for float round-off when checking edges against the image size.
const EDGE_EPSILON: f64 = 1e-9;

/// Clamp a candidate rectangle produced by a draw or resize gesture.
///
/// Per axis, in order:
/// 1. a span shorter than `min_size` grows to `min_size`
/// 2. a negative origin is absorbed into the span (`w += x; x = 0`)
/// 3. a span past the far edge is shortened to end at the edge
/// 4. if that left the span short of `min_size`, it is pulled back inside
///
/// Rectangles that already satisfy the invariants are returned unchanged.
pub fn clamp_rect(rect: Rect, image: &ImageDimensions, min_size: f64) -> Rect {
    let (x, w) = clamp_axis(rect.x, rect.w, image.width as f64, min_size);
    let (y, h) = clamp_axis(rect.y, rect.h, image.height as f64, min_size);
    Rect { x, y, w, h }
}

fn clamp_axis(mut pos: f64, mut len: f64, extent: f64, min_size: f64) -> (f64, f64) {
    if len < min_size {
        len = min_size;
    }
    if pos < 0.0 {
        len += pos;
        pos = 0.0;
    }
    if pos + len > extent {
        len = extent - pos;
    }
    if len < min_size {
        len = min_size.min(extent);
        pos = pos.min(extent - len).max(0.0);
    }
    (pos, len)
}

/// Clamp a translated rectangle so it stays inside the image.
///
/// Only the origin moves: `x` is limited to `[0, width - w]` and `y` to
/// `[0, height - h]`. Width and height are untouched.
pub fn clamp_translation(rect: Rect, image: &ImageDimensions) -> Rect {
    let max_x = (image.width as f64 - rect.w).max(0.0);
    let max_y = (image.height as f64 - rect.h).max(0.0);

    Rect {
        x: rect.x.max(0.0).min(max_x),
        y: rect.y.max(0.0).min(max_y),
        ..rect
    }
}

/// Whether a selection is large enough to be rasterized.
pub fn is_confirmable(rect: Option<&Rect>, min_size: f64) -> bool {
    match rect {
        Some(rect) => rect.w >= min_size && rect.h >= min_size,
        None => false,
    }
}

/// Check every rectangle invariant against the image.
pub fn satisfies_invariants(rect: &Rect, image: &ImageDimensions, min_size: f64) -> bool {
    let width = image.width as f64;
    let height = image.height as f64;

    rect.x >= 0.0
        && rect.y >= 0.0
        && rect.x + rect.w <= width + EDGE_EPSILON
        && rect.y + rect.h <= height + EDGE_EPSILON
        && rect.w >= min_size
        && rect.h >= min_size
}


// ============================================================================
// Property-Based Tests
// ============================================================================
