use cone_geometry::{
    BaseSelectionPolicy, ConeMetrics, Frame, Point, SideLength, Triangle,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// Rectangle `[x1, x2) x [y1, y2)` in full-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegionOfInterest {
    pub x1: u32,
    pub x2: u32,
    pub y1: u32,
    pub y2: u32,
}

impl RegionOfInterest {
    pub fn new(x1: u32, x2: u32, y1: u32, y2: u32) -> Self {
        Self { x1, x2, y1, y2 }
    }

    /// Build from the `[x1, x2, y1, y2]` layout used by camera configuration
    pub fn from_array([x1, x2, y1, y2]: [u32; 4]) -> Self {
        Self { x1, x2, y1, y2 }
    }

    pub fn to_array(self) -> [u32; 4] {
        [self.x1, self.x2, self.y1, self.y2]
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Clamp the far edges to the image and check the region is non-empty.
    ///
    /// `x1`/`y1` are never moved; a start outside the image is a configuration error.
    pub fn clamp_to(&self, width: u32, height: u32) -> Result<Self> {
        let clamped = Self {
            x2: self.x2.min(width),
            y2: self.y2.min(height),
            ..*self
        };

        let invalid = |reason| DetectError::InvalidRoi {
            x1: self.x1,
            x2: self.x2,
            y1: self.y1,
            y2: self.y2,
            width,
            height,
            reason,
        };

        if clamped.x1 >= clamped.x2 {
            return Err(invalid("x1 must be left of x2 and inside the image"));
        }
        if clamped.y1 >= clamped.y2 {
            return Err(invalid("y1 must be above y2 and inside the image"));
        }
        Ok(clamped)
    }

    /// Translate a ROI-local point into full-image coordinates
    pub fn to_image(&self, local: Point) -> Point {
        local.translate(self.x1 as f64, self.y1 as f64)
    }
}

/// Horizontal slice of the ROI, in percent of its width, where the apex is expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConeCenterBand {
    pub min_pct: f64,
    pub max_pct: f64,
}

impl ConeCenterBand {
    pub fn new(min_pct: f64, max_pct: f64) -> Result<Self> {
        Self { min_pct, max_pct }.validated()
    }

    pub fn from_array([min_pct, max_pct]: [f64; 2]) -> Result<Self> {
        Self::new(min_pct, max_pct)
    }

    pub fn validated(self) -> Result<Self> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if in_range(self.min_pct) && in_range(self.max_pct) && self.min_pct <= self.max_pct {
            Ok(self)
        } else {
            Err(DetectError::InvalidConeCenter {
                min_pct: self.min_pct,
                max_pct: self.max_pct,
            })
        }
    }

    /// Band edges in ROI-local x for a ROI of the given width
    pub fn x_range(&self, roi_width: u32) -> (f64, f64) {
        let width = roi_width as f64;
        (width * self.min_pct / 100.0, width * self.max_pct / 100.0)
    }
}

/// Boundary of one connected foreground region, in ROI-local pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point>,
    /// Enclosed area in square pixels
    pub area: f64,
}

impl Contour {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Three characteristic points picked from a contour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectedTriangle {
    pub left: Point,
    pub right: Point,
    pub apex: Point,
    /// The apex came from outside the cone-center band
    pub degraded: bool,
}

impl DetectedTriangle {
    /// Move all points from ROI-local to full-image coordinates
    pub fn to_image(self, roi: &RegionOfInterest) -> Self {
        Self {
            left: roi.to_image(self.left),
            right: roi.to_image(self.right),
            apex: roi.to_image(self.apex),
            degraded: self.degraded,
        }
    }

    /// `[left, right, apex]` in the original image frame
    pub fn to_triangle(&self) -> Triangle {
        Triangle::from_points_in([self.left, self.right, self.apex], Frame::Original)
    }
}

/// Everything a display or export collaborator needs about the current triangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Measurement {
    pub triangle: Triangle,
    pub sides: Vec<SideLength>,
    pub metrics: ConeMetrics,
    pub policy: BaseSelectionPolicy,
}
