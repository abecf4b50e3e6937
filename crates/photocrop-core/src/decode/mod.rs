//! Source image decoding.
//!
//! This module turns the bytes handed over by the hosting UI into the RGB
//! bitmap that a crop session works on:
//! - Decoding JPEG and PNG images
//! - Applying EXIF orientation so the bitmap is upright
//!
//! # Examples
//!
//! ```ignore
//! use photocrop_core::decode::decode_image;
//!
//! let bytes = std::fs::read("avatar.jpg").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod source;
mod types;

pub use source::{decode_image, decode_image_no_orientation, get_orientation};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation};
