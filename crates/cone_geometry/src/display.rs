use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    calibration::CalibrationParams,
    triangle::{Frame, Triangle},
    GeometryError, Point, Result,
};

/// Aspect-preserving fit of an original image into a display canvas.
///
/// Owns the only conversion between [`Frame::Original`] and [`Frame::Display`] coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DisplayTransform {
    pub original_width: u32,
    pub original_height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl DisplayTransform {
    /// Fit `original` into `canvas`, preserving aspect ratio
    pub fn fit(original: (u32, u32), canvas: (u32, u32)) -> Result<Self> {
        let (width, height) = original;
        let (canvas_width, canvas_height) = canvas;
        if width == 0 || height == 0 {
            return Err(GeometryError::InvalidImageSize { width, height });
        }
        if canvas_width == 0 || canvas_height == 0 {
            return Err(GeometryError::InvalidImageSize {
                width: canvas_width,
                height: canvas_height,
            });
        }

        let scale_w = canvas_width as f64 / width as f64;
        let scale_h = canvas_height as f64 / height as f64;
        let scale = scale_w.min(scale_h);

        let display_width = ((width as f64 * scale) as u32).max(1);
        let display_height = ((height as f64 * scale) as u32).max(1);
        debug!(
            "Image scaled from {}x{} to {}x{} to fit canvas {}x{} (scale: {:.2})",
            width, height, display_width, display_height, canvas_width, canvas_height, scale
        );

        Ok(Self {
            original_width: width,
            original_height: height,
            display_width,
            display_height,
        })
    }

    /// Identity transform for an image shown at full resolution
    pub fn identity(width: u32, height: u32) -> Result<Self> {
        Self::fit((width, height), (width, height))
    }

    /// Original pixels per displayed pixel
    pub fn scale_factor(&self) -> f64 {
        self.original_width as f64 / self.display_width as f64
    }

    pub fn point_to_original(&self, point: Point) -> Point {
        point.scale(self.scale_factor())
    }

    pub fn point_to_display(&self, point: Point) -> Point {
        point.scale(1.0 / self.scale_factor())
    }

    /// Express a triangle in original-image pixels
    pub fn to_original(&self, triangle: &Triangle) -> Triangle {
        match triangle.frame() {
            Frame::Original => triangle.clone(),
            Frame::Display => triangle.mapped(Frame::Original, |p| self.point_to_original(p)),
        }
    }

    /// Express a triangle in display pixels
    pub fn to_display(&self, triangle: &Triangle) -> Triangle {
        match triangle.frame() {
            Frame::Display => triangle.clone(),
            Frame::Original => triangle.mapped(Frame::Display, |p| self.point_to_display(p)),
        }
    }

    /// Calibration whose `scale_factor` matches the frame of `triangle`
    pub fn calibration_for(&self, triangle: &Triangle, calibration: &CalibrationParams) -> CalibrationParams {
        let scale_factor = match triangle.frame() {
            Frame::Original => 1.0,
            Frame::Display => self.scale_factor(),
        };
        CalibrationParams {
            scale_factor,
            ..*calibration
        }
    }
}
