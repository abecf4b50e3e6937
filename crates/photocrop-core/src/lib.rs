//! Photocrop Core - interactive square cropping for profile photos
//!
//! This crate provides the selection geometry, drag state machine and square
//! rasterizer behind the profile photo picker, plus decoding of the source
//! image and encoding of the confirmed crop.
//!
//! # Module Structure
//!
//! - `geometry` - Coordinate mapping, rectangle clamping and hit-testing
//! - `drag` - Explicit drag mode and the pure pointer-event reducer
//! - `raster` - Inscribed square extraction and scaling
//! - `session` - Orchestration of pointer input, preview and confirm
//! - `decode` / `encode` - Source image decoding and JPEG output
//! - `config` - Caller-supplied constants

pub mod config;
pub mod decode;
pub mod drag;
pub mod encode;
pub mod geometry;
pub mod raster;
pub mod session;

pub use config::{ConfigError, CropConfig};
pub use decode::{decode_image, DecodeError, DecodedImage, FilterType};
pub use drag::{reduce, CropState, DragAnchor, DragLimits, DragMode, PointerEvent};
pub use geometry::{Direction, DisplayRect, Hit, ImageDimensions, Point, Rect, Viewport};
pub use raster::{inscribed_square, to_square_crop, RasterError, RasterOutput, SquareRegion};
pub use session::{
    CropHost, CropSession, Delivery, EncodeJob, EncodeResult, EncodeTicket, SessionError,
};
