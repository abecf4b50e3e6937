//! Largest centered square inside a selection, scaled to a fixed size.

use image::imageops;

use super::{RasterError, RasterOutput};
use crate::decode::{DecodedImage, FilterType};
use crate::encode::{encode_jpeg, JPEG_MIME};
use crate::geometry::Rect;

/// The inscribed square of a selection, in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareRegion {
    pub x: f64,
    pub y: f64,
    pub side: f64,
}

impl SquareRegion {
    /// Snap to whole source pixels inside a `width x height` image.
    ///
    /// Returns `(x, y, side)`; the side is at least one pixel.
    fn to_pixels(self, width: u32, height: u32) -> (u32, u32, u32) {
        let max_side = width.min(height).max(1);
        let side = (self.side.round() as u32).clamp(1, max_side);
        let x = (self.x.round().max(0.0) as u32).min(width.saturating_sub(side));
        let y = (self.y.round().max(0.0) as u32).min(height.saturating_sub(side));
        (x, y, side)
    }
}

/// Largest square centered inside `rect`.
///
/// `side = min(w, h)`, and the square shares the rectangle's center.
pub fn inscribed_square(rect: &Rect) -> SquareRegion {
    let side = rect.w.min(rect.h);
    SquareRegion {
        x: rect.x + (rect.w - side) / 2.0,
        y: rect.y + (rect.h - side) / 2.0,
        side,
    }
}

/// Scale the inscribed square of `rect` into an `output_size` square.
///
/// The square is snapped to whole source pixels before scaling, so results
/// are reproducible across calls and platforms.
pub fn to_square_crop(
    image: &DecodedImage,
    rect: &Rect,
    output_size: u32,
    filter: FilterType,
) -> Result<DecodedImage, RasterError> {
    if output_size == 0 {
        return Err(RasterError::ZeroOutputSize);
    }
    validate_region(image, rect)?;

    let rgb = image.to_rgb_image().ok_or(RasterError::InvalidBuffer)?;
    let (x, y, side) = inscribed_square(rect).to_pixels(image.width, image.height);
    let square = imageops::crop_imm(&rgb, x, y, side, side).to_image();

    let scaled = if side == output_size {
        square
    } else {
        imageops::resize(&square, output_size, output_size, filter.to_image_filter())
    };

    Ok(DecodedImage::from_rgb_image(scaled))
}

/// Rasterize and JPEG-encode the inscribed square of `rect`.
///
/// `quality` is on the encoder's 1-100 scale.
pub fn encode_square_crop(
    image: &DecodedImage,
    rect: &Rect,
    output_size: u32,
    quality: u8,
    filter: FilterType,
) -> Result<RasterOutput, RasterError> {
    let square = to_square_crop(image, rect, output_size, filter)?;
    let bytes = encode_jpeg(&square.pixels, square.width, square.height, quality)?;

    Ok(RasterOutput {
        width: square.width,
        height: square.height,
        bytes,
        mime: JPEG_MIME,
    })
}

fn validate_region(image: &DecodedImage, rect: &Rect) -> Result<(), RasterError> {
    let width = image.width as f64;
    let height = image.height as f64;

    let finite =
        rect.x.is_finite() && rect.y.is_finite() && rect.w.is_finite() && rect.h.is_finite();
    let inside = rect.x >= 0.0
        && rect.y >= 0.0
        && rect.w > 0.0
        && rect.h > 0.0
        && rect.x < width
        && rect.y < height;

    if image.is_empty() || !finite || !inside {
        return Err(RasterError::InvalidRegion {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            width: image.width,
            height: image.height,
        });
    }
    Ok(())
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (0.0f64..500.0, 0.0f64..500.0, 1.0f64..500.0, 1.0f64..500.0)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    fn gradient_image(width: u32, height: u32) -> DecodedImage {
        let pixels = (0..(width * height * 3) as usize)
            .map(|i| (i * 7 % 256) as u8)
            .collect();
        DecodedImage::new(width, height, pixels)
    }

    proptest! {
        /// Property: the inscribed square has side min(w, h) and shares the rect's center.
        #[test]
        fn prop_centered_square_law(rect in rect_strategy()) {
            let square = inscribed_square(&rect);

            prop_assert_eq!(square.side, rect.w.min(rect.h));
            prop_assert!((square.x + square.side / 2.0 - (rect.x + rect.w / 2.0)).abs() < 1e-9);
            prop_assert!((square.y + square.side / 2.0 - (rect.y + rect.h / 2.0)).abs() < 1e-9);
        }

        /// Property: the inscribed square stays inside its rectangle.
        #[test]
        fn prop_square_inside_rect(rect in rect_strategy()) {
            let square = inscribed_square(&rect);

            prop_assert!(square.x >= rect.x - 1e-9);
            prop_assert!(square.y >= rect.y - 1e-9);
            prop_assert!(square.x + square.side <= rect.right() + 1e-9);
            prop_assert!(square.y + square.side <= rect.bottom() + 1e-9);
        }

        /// Property: identical inputs give identical pixels.
        #[test]
        fn prop_square_crop_deterministic(
            (width, height) in (10u32..=80, 10u32..=80),
            (fx, fy, fw, fh) in (0.0f64..0.5, 0.0f64..0.5, 0.1f64..0.5, 0.1f64..0.5),
            output_size in 1u32..=96,
        ) {
            let img = gradient_image(width, height);
            let rect = Rect::new(
                fx * width as f64,
                fy * height as f64,
                fw * width as f64,
                fh * height as f64,
            );

            let a = to_square_crop(&img, &rect, output_size, FilterType::Bilinear).unwrap();
            let b = to_square_crop(&img, &rect, output_size, FilterType::Bilinear).unwrap();

            prop_assert_eq!(a.width, output_size);
            prop_assert_eq!(a.height, output_size);
            prop_assert_eq!(a.pixels, b.pixels);
        }
    }
}
