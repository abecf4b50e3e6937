//! Conversion between display (client) pixels and bitmap pixels.
//!
//! The mapping is a plain linear scale plus offset. All functions return
//! `None` when the viewport is not ready (zero-sized layout or empty image)
//! or the input is not finite, so NaN never reaches a selection.

use super::{DisplayRect, ImageDimensions, Point};

/// Map a client point into bitmap space, clamped to the image.
///
/// ```text
/// x = clamp((client_x - display.left) * image.width / display.width, 0, image.width)
/// ```
///
/// Returns `None` if the image has not been rendered yet.
pub fn to_bitmap(
    client_x: f64,
    client_y: f64,
    display: &DisplayRect,
    image: &ImageDimensions,
) -> Option<Point> {
    if !display.is_ready() || image.is_empty() || !client_x.is_finite() || !client_y.is_finite() {
        return None;
    }

    let width = image.width as f64;
    let height = image.height as f64;

    let x = ((client_x - display.left) * width / display.width).clamp(0.0, width);
    let y = ((client_y - display.top) * height / display.height).clamp(0.0, height);

    Some(Point::new(x, y))
}

/// Project a bitmap point outward into client space.
///
/// Used by hit-testing so that handle tolerances are measured in screen
/// pixels regardless of how far the image is scaled.
pub fn to_client(point: Point, display: &DisplayRect, image: &ImageDimensions) -> Option<Point> {
    if !display.is_ready() || image.is_empty() || !point.x.is_finite() || !point.y.is_finite() {
        return None;
    }

    Some(Point::new(
        point.x / image.width as f64 * display.width + display.left,
        point.y / image.height as f64 * display.height + display.top,
    ))
}

/// Scale a client-space delta into a bitmap-space delta (no clamping).
pub fn client_delta_to_bitmap(
    dx: f64,
    dy: f64,
    display: &DisplayRect,
    image: &ImageDimensions,
) -> Option<Point> {
    if !display.is_ready() || image.is_empty() || !dx.is_finite() || !dy.is_finite() {
        return None;
    }

    Some(Point::new(
        dx * image.width as f64 / display.width,
        dy * image.height as f64 / display.height,
    ))
}
