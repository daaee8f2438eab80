//! # Cone Geometry - Pile Triangle to Cone Metrics
//!
//! Pure geometry shared by the detection pipeline and any editing front end: points and
//! triangles with an explicit coordinate frame, the shoelace/height primitives, and the cone
//! model that turns a triangle plus calibration into volume, radius, height and mass.
//!
//! ## Example
//!
//! ```rust
//! use cone_geometry::{BaseSelectionPolicy, CalibrationParams, ConeVolumeModel, Point, Triangle};
//!
//! let triangle = Triangle::from_points([
//!     Point::new(0.0, 0.0),
//!     Point::new(100.0, 0.0),
//!     Point::new(50.0, 100.0),
//! ]);
//! let calibration = CalibrationParams::new(0.01, 1.0).unwrap();
//!
//! let model = ConeVolumeModel::new(BaseSelectionPolicy::FixedFirstTwo);
//! let metrics = model.compute(&triangle, &calibration);
//! assert!((metrics.volume - std::f64::consts::PI / 12.0).abs() < 1e-9);
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod calibration;
pub mod cone;
pub mod display;
pub mod geometry;
pub mod triangle;

pub use calibration::{CalibrationParams, DEFAULT_K_DEN, DEFAULT_K_VOL, DEFAULT_PIXEL_SIZE_M};
pub use cone::{BaseSelection, BaseSelectionPolicy, ConeMetrics, ConeVolumeModel};
pub use display::DisplayTransform;
pub use geometry::{distance, triangle_area, triangle_height};
pub use triangle::{Frame, SideLabel, SideLength, Triangle, DEFAULT_PICK_TOLERANCE};

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Errors raised while building geometry inputs.
///
/// Degenerate triangles are not errors: they yield zeroed [`ConeMetrics`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Invalid calibration: {field} must be a positive finite number, got {value}")]
    InvalidCalibration { field: &'static str, value: f64 },

    #[error("Invalid image size: {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
}

/// 2D point with floating-point pixel coordinates.
///
/// The frame the coordinates live in is tracked by the owning [`Triangle`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate this point by the given offsets
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Multiply both coordinates by `factor`
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Calculate distance to another point
    pub fn distance_to(self, other: Self) -> f64 {
        geometry::distance(self, other)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}
