use crate::{
    pipeline::Segmenter,
    traits::{ImagePreprocessor, ContourExtractor},
    algorithms::{
        ExternalContourExtractor,
        InvertedThresholdPreprocessor,
        OpeningPreprocessor,
    },
};

/// Builder for creating segmenters with a fluent API
pub struct SegmenterBuilder {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
}

impl SegmenterBuilder {
    /// Create a new segmenter builder
    pub fn new() -> Self {
        Self {
            preprocessors: Vec::new(),
            contour_extractor: None,
        }
    }

    /// Add a preprocessor to the segmenter
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: ImagePreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Add an inverted (dark-is-foreground) threshold step
    pub fn with_inverted_threshold(self, threshold: u8) -> Self {
        self.add_preprocessor(InvertedThresholdPreprocessor { threshold })
    }

    /// Add a morphological opening step with an ellipse of the given radius
    pub fn with_opening(self, radius: u8) -> Self {
        self.add_preprocessor(OpeningPreprocessor { radius })
    }

    /// Build the segmenter with default components if not specified
    pub fn build(self) -> Segmenter {
        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(ExternalContourExtractor));

        Segmenter::new(self.preprocessors, contour_extractor)
    }

    /// Inverted threshold, 5x5 elliptical opening, external contours
    pub fn build_default(threshold: u8) -> Segmenter {
        Self::new()
            .with_inverted_threshold(threshold)
            .with_opening(OpeningPreprocessor::default().radius)
            .build()
    }
}

impl Default for SegmenterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
