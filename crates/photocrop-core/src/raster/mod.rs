//! Rasterization of the final square crop.
//!
//! The selection rectangle may have any aspect ratio; the output is always the
//! largest centered square inside it, scaled to a fixed resolution. Two call
//! sites exist:
//!
//! - **Save**: `save_output_size` (512) and JPEG-encoded, handed to the upload
//!   collaborator.
//! - **Preview**: `preview_output_size` (80 or 128) raw pixels, recomputed on
//!   every selection change.
//!
//! Both are pure functions of `(image, rect, output_size)`: the same inputs
//! yield byte-identical output.

mod square;

pub use square::{encode_square_crop, inscribed_square, to_square_crop, SquareRegion};

use thiserror::Error;

use crate::encode::EncodeError;

/// Errors that can occur while rasterizing a crop.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Output side length of zero
    #[error("Output size must be at least 1 pixel")]
    ZeroOutputSize,

    /// Rectangle is empty, non-finite or outside the image
    #[error("Crop region {x},{y} {w}x{h} does not fit a {width}x{height} image")]
    InvalidRegion {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        width: u32,
        height: u32,
    },

    /// Pixel buffer does not match the image dimensions
    #[error("Source pixel buffer is inconsistent with its dimensions")]
    InvalidBuffer,

    /// Encoding the square failed
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// An encoded square crop, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterOutput {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`
    pub mime: &'static str,
}

impl RasterOutput {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
