use cone_geometry::Triangle;
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::{
    algorithms::CenterBandClassifier,
    error::Result,
    pipeline::builder::SegmenterBuilder,
    profiles::{DetectorKind, PileProfile, ProfileOverride},
    traits::TriangleClassifier,
    types::{DetectedTriangle, RegionOfInterest},
};

/// Outcome of a successful automatic detection, in full-image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub triangle: DetectedTriangle,
    /// ROI actually used, after clamping to the image
    pub roi: RegionOfInterest,
    /// Area of the pile contour in square pixels
    pub contour_area: f64,
}

impl Detection {
    /// `[left, right, apex]` in the original image frame
    pub fn to_triangle(&self) -> Triangle {
        self.triangle.to_triangle()
    }

    pub fn is_degraded(&self) -> bool {
        self.triangle.degraded
    }
}

/// Runs segmentation and classification for a named pile.
pub struct DetectionOrchestrator {
    classifier: Box<dyn TriangleClassifier>,
}

impl DetectionOrchestrator {
    pub fn new() -> Self {
        Self::with_classifier(CenterBandClassifier::default())
    }

    /// Use a different strategy for reducing the contour to three points
    pub fn with_classifier<C>(classifier: C) -> Self
    where
        C: TriangleClassifier + 'static,
    {
        Self {
            classifier: Box::new(classifier),
        }
    }

    /// Resolve the effective profile: built-in, then camera configuration, then explicit threshold
    pub fn resolve_profile(
        pile_id: &str,
        threshold: Option<u8>,
        camera_config: Option<&ProfileOverride>,
    ) -> Result<PileProfile> {
        let mut profile = PileProfile::for_id(pile_id)?;
        if let Some(config) = camera_config {
            profile = profile.with_override(config)?;
        }
        if let Some(threshold) = threshold {
            profile.threshold = threshold;
        }
        Ok(profile)
    }

    /// Find the pile triangle `[left, right, apex]` in `image`.
    ///
    /// `Ok(None)` means nothing was found; configuration problems are errors.
    pub fn detect(
        &self,
        image: &DynamicImage,
        pile_id: &str,
        threshold: Option<u8>,
        camera_config: Option<&ProfileOverride>,
    ) -> Result<Option<Triangle>> {
        let profile = Self::resolve_profile(pile_id, threshold, camera_config)?;
        let detection = self.detect_with_profile(image, &profile)?;
        Ok(detection.map(|d| d.to_triangle()))
    }

    /// Detection with an already resolved profile
    pub fn detect_with_profile(
        &self,
        image: &DynamicImage,
        profile: &PileProfile,
    ) -> Result<Option<Detection>> {
        let band = profile.cone_center.validated()?;
        let roi = profile.roi.clamp_to(image.width(), image.height())?;

        if profile.detector == DetectorKind::Placeholder {
            warn!("No automatic detector configured for {}", profile.kind);
            return Ok(None);
        }

        debug!(
            "Detecting {} with threshold {} in ROI {:?}",
            profile.kind,
            profile.threshold,
            roi.to_array()
        );

        let segmenter = SegmenterBuilder::build_default(profile.threshold);
        let Some(contour) = segmenter.segment(image, &roi)? else {
            info!("No pile contour found for {}", profile.kind);
            return Ok(None);
        };

        let Some(local) = self
            .classifier
            .classify(&contour, roi.width(), roi.height(), &band)
        else {
            info!("Could not classify pile contour for {}", profile.kind);
            return Ok(None);
        };

        let triangle = local.to_image(&roi);
        info!(
            "Detected {} triangle: left ({}, {}), right ({}, {}), apex ({}, {})",
            profile.kind,
            triangle.left.x,
            triangle.left.y,
            triangle.right.x,
            triangle.right.y,
            triangle.apex.x,
            triangle.apex.y
        );

        Ok(Some(Detection {
            triangle,
            roi,
            contour_area: contour.area,
        }))
    }
}

impl Default for DetectionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::DetectError;
    use cone_geometry::{Frame, Point};
    use image::{Rgb, RgbImage};
    use imageproc::{drawing::draw_polygon_mut, point::Point as PixelPoint};

    /// Light floor with a dark filled triangle at the given full-image vertices
    pub(crate) fn pile_image(width: u32, height: u32, vertices: [(i32, i32); 3], shade: u8) -> DynamicImage {
        let mut img = RgbImage::from_pixel(width, height, Rgb([220, 220, 220]));
        let poly: Vec<PixelPoint<i32>> = vertices.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect();
        draw_polygon_mut(&mut img, &poly, Rgb([shade, shade, shade]));
        DynamicImage::ImageRgb8(img)
    }

    fn small_roi() -> ProfileOverride {
        ProfileOverride {
            roi: Some([50, 350, 40, 290]),
            ..Default::default()
        }
    }

    fn assert_near(actual: Point, expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.x - expected.0).abs() <= tolerance && (actual.y - expected.1).abs() <= tolerance,
            "{actual:?} not within {tolerance} of {expected:?}"
        );
    }

    #[test]
    fn test_uniform_image_detects_nothing() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1600, 700, Rgb([200, 200, 200])));
        let orchestrator = DetectionOrchestrator::new();
        assert_eq!(orchestrator.detect(&image, "ZIF1", None, None).unwrap(), None);
        assert_eq!(orchestrator.detect(&image, "ZIF2", None, None).unwrap(), None);
    }

    #[test]
    fn test_unknown_pile_is_error() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([200, 200, 200])));
        let err = DetectionOrchestrator::new()
            .detect(&image, "ZIF7", None, None)
            .unwrap_err();
        assert!(matches!(err, DetectError::UnknownPileConfiguration(_)));
    }

    #[test]
    fn test_roi_outside_image_is_error() {
        // Built-in ZIF1 ROI starts at x=1125.
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, Rgb([200, 200, 200])));
        let err = DetectionOrchestrator::new()
            .detect(&image, "ZIF1", None, None)
            .unwrap_err();
        assert!(matches!(err, DetectError::InvalidRoi { .. }));
    }

    #[test]
    fn test_detects_triangle_in_full_image_coordinates() {
        let image = pile_image(400, 300, [(80, 270), (320, 270), (200, 80)], 40);
        let triangle = DetectionOrchestrator::new()
            .detect(&image, "ZIF2", None, Some(&small_roi()))
            .unwrap()
            .expect("pile should be detected");

        assert_eq!(triangle.frame(), Frame::Original);
        let [left, right, apex] = triangle.vertices().unwrap();
        assert_near(left, (80.0, 270.0), 8.0);
        assert_near(right, (320.0, 270.0), 8.0);
        assert_near(apex, (200.0, 80.0), 8.0);
    }

    #[test]
    fn test_explicit_threshold_wins() {
        // Shade 100 is brighter than the ZIF2 threshold of 85.
        let image = pile_image(400, 300, [(80, 270), (320, 270), (200, 80)], 100);
        let orchestrator = DetectionOrchestrator::new();
        let config = small_roi();

        assert_eq!(orchestrator.detect(&image, "ZIF2", None, Some(&config)).unwrap(), None);

        let config_threshold = ProfileOverride {
            threshold: Some(40),
            ..small_roi()
        };
        let found = orchestrator
            .detect(&image, "ZIF2", Some(120), Some(&config_threshold))
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_placeholder_detector_reports_not_found() {
        let image = pile_image(400, 300, [(80, 270), (320, 270), (200, 80)], 40);
        let config = ProfileOverride {
            detector: Some(DetectorKind::Placeholder),
            ..small_roi()
        };
        let result = DetectionOrchestrator::new()
            .detect(&image, "ZIF1", None, Some(&config))
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_detection_reports_contour_area() {
        let image = pile_image(400, 300, [(80, 270), (320, 270), (200, 80)], 40);
        let profile = DetectionOrchestrator::resolve_profile("ZIF2", None, Some(&small_roi())).unwrap();
        let detection = DetectionOrchestrator::new()
            .detect_with_profile(&image, &profile)
            .unwrap()
            .unwrap();

        // Drawn triangle covers 0.5 * 240 * 190 square pixels.
        assert!((detection.contour_area - 22_800.0).abs() < 2_000.0);
        assert!(!detection.is_degraded());
        assert_eq!(detection.roi.to_array(), [50, 350, 40, 290]);
    }
}
