//! Square crop WASM bindings.
//!
//! Stateless access to the rasterizer for hosts that keep their own
//! selection, e.g. re-rendering a saved crop.
//!
//! # Example
//!
//! ```typescript
//! // 128px preview of the square inside a 300x200 selection at (40, 10)
//! const preview = square_crop(image, 40, 10, 300, 200, 128, 1);
//! const jpeg = encode_square_crop(image, 40, 10, 300, 200, 512, 0.95);
//! ```

use crate::types::{filter_from_u8, JsDecodedImage};
use photocrop_core::config::quality_to_jpeg;
use photocrop_core::geometry::Rect;
use photocrop_core::raster;
use wasm_bindgen::prelude::*;

/// Scale the largest centered square inside the rectangle to `output_size`.
///
/// `filter`: 0 = nearest, 1 = bilinear, 2 = lanczos3.
#[wasm_bindgen]
pub fn square_crop(
    image: &JsDecodedImage,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    output_size: u32,
    filter: u8,
) -> Result<JsDecodedImage, JsValue> {
    raster::to_square_crop(
        &image.to_decoded(),
        &Rect::new(x, y, w, h),
        output_size,
        filter_from_u8(filter),
    )
    .map(JsDecodedImage::from_decoded)
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Square crop encoded as JPEG. `quality` is 0.0 to 1.0.
#[wasm_bindgen]
pub fn encode_square_crop(
    image: &JsDecodedImage,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    output_size: u32,
    quality: f32,
) -> Result<Vec<u8>, JsValue> {
    raster::encode_square_crop(
        &image.to_decoded(),
        &Rect::new(x, y, w, h),
        output_size,
        quality_to_jpeg(quality),
        photocrop_core::FilterType::Bilinear,
    )
    .map(|output| output.bytes)
    .map_err(|e| JsValue::from_str(&e.to_string()))
}
