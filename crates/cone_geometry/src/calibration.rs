use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, Result};

/// Metres per pixel used when nothing else is configured (1 mm).
pub const DEFAULT_PIXEL_SIZE_M: f64 = 0.001;
/// Ideal cone, no shape correction.
pub const DEFAULT_K_VOL: f64 = 1.0;
/// Bulk density of crushed ore in tonnes per cubic metre.
pub const DEFAULT_K_DEN: f64 = 1.7;

/// Pixel-to-metric calibration for one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationParams {
    /// Metric length of one pixel at the original image resolution
    pub pixel_size_m: f64,
    /// Original pixels per displayed pixel; 1.0 when the triangle is in the original frame
    #[serde(default = "one")]
    pub scale_factor: f64,
    /// Dimensionless correction between the ideal cone and the real pile shape
    #[serde(default = "default_k_vol")]
    pub k_vol: f64,
    /// Bulk density, mass units per cubic metric unit
    #[serde(default = "default_k_den")]
    pub k_den: f64,
}

fn one() -> f64 {
    1.0
}

fn default_k_vol() -> f64 {
    DEFAULT_K_VOL
}

fn default_k_den() -> f64 {
    DEFAULT_K_DEN
}

impl CalibrationParams {
    /// Create calibration with default `k_vol` and `k_den`
    pub fn new(pixel_size_m: f64, scale_factor: f64) -> Result<Self> {
        Self {
            pixel_size_m,
            scale_factor,
            k_vol: DEFAULT_K_VOL,
            k_den: DEFAULT_K_DEN,
        }
        .validated()
    }

    /// Replace the volume correction coefficient
    pub fn with_k_vol(mut self, k_vol: f64) -> Result<Self> {
        self.k_vol = k_vol;
        self.validated()
    }

    /// Replace the bulk density
    pub fn with_k_den(mut self, k_den: f64) -> Result<Self> {
        self.k_den = k_den;
        self.validated()
    }

    /// Same calibration measured against a display copy scaled by `scale_factor`
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Result<Self> {
        self.scale_factor = scale_factor;
        self.validated()
    }

    /// Check every field, returning the calibration unchanged when it is usable.
    pub fn validated(self) -> Result<Self> {
        positive("pixel_size_m", self.pixel_size_m)?;
        positive("scale_factor", self.scale_factor)?;
        non_negative("k_vol", self.k_vol)?;
        non_negative("k_den", self.k_den)?;
        Ok(self)
    }

    pub fn is_valid(&self) -> bool {
        self.validated().is_ok()
    }

    /// Convert a length measured in the triangle's frame into metres
    pub fn to_metres(&self, length_px: f64) -> f64 {
        length_px * self.scale_factor * self.pixel_size_m
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            pixel_size_m: DEFAULT_PIXEL_SIZE_M,
            scale_factor: 1.0,
            k_vol: DEFAULT_K_VOL,
            k_den: DEFAULT_K_DEN,
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidCalibration { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidCalibration { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let calibration = CalibrationParams::new(0.05, 2.0).unwrap();
        assert_eq!(calibration.k_vol, 1.0);
        assert_eq!(calibration.k_den, 1.7);
        assert!(calibration.is_valid());
        assert!(CalibrationParams::default().is_valid());
    }

    #[test]
    fn test_rejects_non_positive_pixel_size() {
        assert!(CalibrationParams::new(0.0, 1.0).is_err());
        assert!(CalibrationParams::new(-0.1, 1.0).is_err());
        assert!(CalibrationParams::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_rejects_non_positive_scale_factor() {
        let err = CalibrationParams::new(0.1, 0.0).unwrap_err();
        assert_eq!(
            err,
            GeometryError::InvalidCalibration {
                field: "scale_factor",
                value: 0.0
            }
        );
    }

    #[test]
    fn test_builders_validate() {
        let calibration = CalibrationParams::new(0.1, 1.0).unwrap();
        assert!(calibration.with_k_den(-1.0).is_err());
        assert!(calibration.with_k_vol(f64::INFINITY).is_err());
        assert_eq!(calibration.with_k_vol(0.85).unwrap().k_vol, 0.85);
    }

    #[test]
    fn test_to_metres_projects_through_scale() {
        let calibration = CalibrationParams::new(0.01, 2.0).unwrap();
        assert!((calibration.to_metres(100.0) - 2.0).abs() < 1e-12);
    }
}
