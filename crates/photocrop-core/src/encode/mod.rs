//! Output encoding for confirmed crops.
//!
//! The square crop is handed to the upload collaborator as a JPEG blob.
//!
//! # Examples
//!
//! ```ignore
//! use photocrop_core::encode::encode_jpeg;
//!
//! let pixels = vec![128u8; 512 * 512 * 3]; // Gray square
//! let jpeg_bytes = encode_jpeg(&pixels, 512, 512, 95).unwrap();
//! println!("Encoded {} bytes", jpeg_bytes.len());
//! ```

mod jpeg;

pub use jpeg::{encode_jpeg, EncodeError, JPEG_MIME};
