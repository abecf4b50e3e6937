//! Crop geometry: coordinate spaces, clamping and hit-testing.
//!
//! Everything in this module is a pure function over small `Copy` values, so
//! it can be exercised without an image, a canvas or an event loop.
//!
//! # Coordinate Spaces
//!
//! - **Bitmap space**: natural pixel coordinates of the source image. The crop
//!   rectangle is always stored here.
//! - **Display (client) space**: pixel coordinates of the image as it is laid
//!   out on screen, described by a [`DisplayRect`].
//!
//! Origin is the top-left corner in both spaces.

mod clamp;
mod mapper;

pub use clamp::{clamp_rect, clamp_translation, is_confirmable, satisfies_invariants};
pub use hit_test::{classify, Direction, Hit};
pub use mapper::{client_delta_to_bitmap, to_bitmap, to_client};

use serde::{Deserialize, Serialize};

/// Natural pixel size of the loaded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either axis is zero (nothing to map into).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Where the image is rendered on screen, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A display rect is ready once the image has a finite position and a
    /// non-zero, finite layout size.
    pub fn is_ready(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// A point in either coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Crop rectangle in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Normalized bounding box of two opposite corners.
    ///
    /// The top-left of the result is always the lesser of the two corners,
    /// whichever direction the pointer travelled.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Translate by a bitmap-space offset. Size is unchanged.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// The image as the pointer sees it: natural size plus on-screen placement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub image: ImageDimensions,
    pub display: DisplayRect,
}

impl Viewport {
    pub fn new(image: ImageDimensions, display: DisplayRect) -> Self {
        Self { image, display }
    }

    /// Pointer handlers must no-op until this is true.
    pub fn is_ready(&self) -> bool {
        !self.image.is_empty() && self.display.is_ready()
    }
}
