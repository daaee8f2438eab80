pub mod builder;

use image::DynamicImage;
use tracing::{debug, warn};
use crate::{
    algorithms::largest_contour,
    error::Result,
    traits::{ImagePreprocessor, ContourExtractor},
    types::{Contour, RegionOfInterest},
};

/// ROI segmentation: crop, luma, preprocessing steps, then the largest external contour
pub struct Segmenter {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    contour_extractor: Box<dyn ContourExtractor>,
}

impl Segmenter {
    /// Create a new segmenter builder
    pub fn builder() -> builder::SegmenterBuilder {
        builder::SegmenterBuilder::new()
    }

    /// Create a new segmenter with the given components
    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        contour_extractor: Box<dyn ContourExtractor>,
    ) -> Self {
        Self {
            preprocessors,
            contour_extractor,
        }
    }

    /// Segment the pile inside `roi`.
    ///
    /// The far ROI edges are clamped to the image; an ROI that is still empty is a
    /// configuration error. `Ok(None)` means the image held no foreground region.
    /// Returned points are ROI-local.
    pub fn segment(&self, image: &DynamicImage, roi: &RegionOfInterest) -> Result<Option<Contour>> {
        let roi = roi.clamp_to(image.width(), image.height())?;
        debug!("ROI coordinates: {:?}", roi.to_array());

        // Step 1: Crop and convert to single-channel intensity
        let mut processed_image = image
            .crop_imm(roi.x1, roi.y1, roi.width(), roi.height())
            .to_luma8();

        // Step 2: Apply all preprocessors in sequence
        for preprocessor in &self.preprocessors {
            processed_image = preprocessor.preprocess(&processed_image)?;
        }

        // Step 3: Extract external contours and keep the largest
        let contours = self.contour_extractor.extract_contours(&processed_image)?;
        if contours.is_empty() {
            warn!("No contours found in ROI");
            return Ok(None);
        }
        let count = contours.len();
        let largest = largest_contour(contours).filter(|c| !c.is_empty());
        if let Some(contour) = &largest {
            debug!("Largest of {} contours: area {:.1}, {} points", count, contour.area, contour.points.len());
        }

        Ok(largest)
    }

    /// Get information about the segmenter configuration
    pub fn info(&self) -> String {
        format!(
            "Segmenter: {} preprocessors, 1 contour extractor",
            self.preprocessors.len()
        )
    }
}
