//! Caller-supplied constants for a crop session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::FilterType;
use crate::drag::DragLimits;

/// Minimum selection side in bitmap pixels.
pub const DEFAULT_MIN_SIZE: f64 = 10.0;
/// Handle hit radius in client pixels.
pub const DEFAULT_TOLERANCE_PX: f64 = 16.0;
/// Side of the square uploaded on confirm.
pub const DEFAULT_SAVE_OUTPUT_SIZE: u32 = 512;
/// Side of the live preview square.
pub const DEFAULT_PREVIEW_OUTPUT_SIZE: u32 = 128;
/// Encoder quality, 0.0 to 1.0.
pub const DEFAULT_QUALITY: f32 = 0.95;

/// Errors from validating a [`CropConfig`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("min_size must be a positive finite number, got {0}")]
    InvalidMinSize(f64),

    #[error("tolerance_px must be a non-negative finite number, got {0}")]
    InvalidTolerance(f64),

    #[error("{field} must be at least 1 pixel")]
    ZeroOutputSize { field: &'static str },

    #[error("quality must be in (0, 1], got {0}")]
    InvalidQuality(f32),
}

/// Settings for a crop session.
///
/// Deserializes from a partial object; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropConfig {
    /// Minimum selection side (bitmap px)
    pub min_size: f64,
    /// Handle hit radius (client px)
    pub tolerance_px: f64,
    /// Output side for the uploaded image
    pub save_output_size: u32,
    /// Output side for the live preview
    pub preview_output_size: u32,
    /// Encoder quality (0.0 to 1.0)
    pub quality: f32,
    /// Scaling filter used when rasterizing
    pub filter: FilterType,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            tolerance_px: DEFAULT_TOLERANCE_PX,
            save_output_size: DEFAULT_SAVE_OUTPUT_SIZE,
            preview_output_size: DEFAULT_PREVIEW_OUTPUT_SIZE,
            quality: DEFAULT_QUALITY,
            filter: FilterType::default(),
        }
    }
}

impl CropConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values that would make the geometry or the encoder misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_size.is_finite() || self.min_size <= 0.0 {
            return Err(ConfigError::InvalidMinSize(self.min_size));
        }
        if !self.tolerance_px.is_finite() || self.tolerance_px < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance_px));
        }
        if self.save_output_size == 0 {
            return Err(ConfigError::ZeroOutputSize {
                field: "save_output_size",
            });
        }
        if self.preview_output_size == 0 {
            return Err(ConfigError::ZeroOutputSize {
                field: "preview_output_size",
            });
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(ConfigError::InvalidQuality(self.quality));
        }
        Ok(())
    }

    /// The subset of settings the drag reducer needs.
    pub fn limits(&self) -> DragLimits {
        DragLimits {
            min_size: self.min_size,
            tolerance_px: self.tolerance_px,
        }
    }

    /// Quality on the JPEG encoder's 1-100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        quality_to_jpeg(self.quality)
    }
}

/// Map a 0.0-1.0 quality to the JPEG encoder's 1-100 scale.
pub fn quality_to_jpeg(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
