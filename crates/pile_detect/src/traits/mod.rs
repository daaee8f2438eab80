use image::GrayImage;
use crate::{
    error::Result,
    types::{ConeCenterBand, Contour, DetectedTriangle},
};

/// Trait for image preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync {
    /// Transform a single-channel image (e.g., binarize, clean up noise)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract the outer contours of the foreground regions of a binary image
    fn extract_contours(&self, image: &GrayImage) -> Result<Vec<Contour>>;
}

/// Trait for reducing a pile contour to base and apex points
pub trait TriangleClassifier: Send + Sync {
    /// Pick left-base, right-base and apex points, in the contour's ROI-local coordinates.
    ///
    /// Returns `None` when the contour has no points.
    fn classify(
        &self,
        contour: &Contour,
        roi_width: u32,
        roi_height: u32,
        band: &ConeCenterBand,
    ) -> Option<DetectedTriangle>;
}
