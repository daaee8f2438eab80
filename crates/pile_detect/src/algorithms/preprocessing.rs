use image::{GrayImage, Luma};
use crate::{error::Result, traits::ImagePreprocessor};

/// Inverted global threshold: pixels at or below `threshold` become foreground (255).
///
/// Assumes the ore pile is darker than the floor behind it. A bright pile on a dark floor
/// needs a different preprocessor, not a different threshold.
#[derive(Debug, Clone)]
pub struct InvertedThresholdPreprocessor {
    pub threshold: u8,
}

impl Default for InvertedThresholdPreprocessor {
    fn default() -> Self {
        Self { threshold: 80 }
    }
}

impl ImagePreprocessor for InvertedThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let mut binary = imageproc::contrast::threshold(image, self.threshold);
        image::imageops::invert(&mut binary);
        Ok(binary)
    }
}

/// Morphological opening (erosion then dilation) with an elliptical structuring element.
///
/// Removes speckles the ellipse does not fit into while keeping the bulk of the pile.
#[derive(Debug, Clone)]
pub struct OpeningPreprocessor {
    pub radius: u8,
}

impl Default for OpeningPreprocessor {
    fn default() -> Self {
        // 5x5 elliptical kernel
        Self { radius: 2 }
    }
}

impl ImagePreprocessor for OpeningPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        let element = StructuringElement::ellipse(self.radius);
        Ok(element.dilate(&element.erode(image)))
    }
}

/// Offsets from the anchor pixel covered by a symmetric structuring element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Ellipse inscribed in a `(2r+1) x (2r+1)` box.
    ///
    /// Row `dy` spans `|dx| <= round(r * sqrt(1 - dy^2 / r^2))`, the same rasterisation as
    /// OpenCV's `MORPH_ELLIPSE`: for `r = 2` the top and bottom rows are a single pixel and
    /// the middle three rows are full, 17 pixels in total.
    pub fn ellipse(radius: u8) -> Self {
        let r = radius as i32;
        if r == 0 {
            return Self { offsets: vec![(0, 0)] };
        }
        let rf = r as f64;
        let mut offsets = Vec::new();
        for dy in -r..=r {
            let half = (rf * (1.0 - (dy * dy) as f64 / (rf * rf)).sqrt()).round() as i32;
            for dx in -half..=half {
                offsets.push((dx, dy));
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Minimum over the element; pixels outside the image are ignored
    pub fn erode(&self, image: &GrayImage) -> GrayImage {
        self.apply(image, u8::MAX, u8::min)
    }

    /// Maximum over the element; pixels outside the image are ignored
    pub fn dilate(&self, image: &GrayImage) -> GrayImage {
        self.apply(image, u8::MIN, u8::max)
    }

    fn apply(&self, image: &GrayImage, init: u8, pick: fn(u8, u8) -> u8) -> GrayImage {
        let (width, height) = image.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let value = self
                .offsets
                .iter()
                .filter_map(|&(dx, dy)| {
                    let sx = u32::try_from(x as i64 + dx as i64).ok()?;
                    let sy = u32::try_from(y as i64 + dy as i64).ok()?;
                    (sx < width && sy < height).then(|| image.get_pixel(sx, sy)[0])
                })
                .fold(init, pick);
            Luma([value])
        })
    }
}
