//! Photocrop WASM - WebAssembly bindings for Photocrop
//!
//! This crate exposes the photocrop-core crop session and rasterizer to
//! JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for image data
//! - `decode` - Source image decoding bindings (JPEG, PNG)
//! - `raster` - Stateless square crop and encode bindings
//! - `session` - Interactive crop session driven by pointer events
//!
//! # Usage
//!
//! ```typescript
//! import init, { decode_image, JsCropSession } from '@photocrop/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const image = decode_image(bytes);
//! const session = new JsCropSession(image, undefined, onConfirm, onCancel);
//! ```

use wasm_bindgen::prelude::*;

mod decode;
mod raster;
mod session;
mod types;

// Re-export public types
pub use decode::{decode_image, decode_image_no_orientation, image_orientation};
pub use raster::{encode_square_crop, square_crop};
pub use session::JsCropSession;
pub use types::JsDecodedImage;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    log::debug!("photocrop wasm {} loaded", version());
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
