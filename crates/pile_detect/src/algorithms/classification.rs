use cone_geometry::Point;
use tracing::{debug, warn};
use crate::{
    traits::TriangleClassifier,
    types::{ConeCenterBand, Contour, DetectedTriangle},
};

/// Picks the apex inside a horizontal center band and the base from the bottom of the ROI.
///
/// Assumes a roughly frontal, unobstructed view: the silhouette is widest near the floor and
/// narrows to a single peak within a known band. This is a heuristic, not a geometric fit.
#[derive(Debug, Clone)]
pub struct CenterBandClassifier {
    /// Fraction of ROI height below which points may form the base
    pub bottom_fraction: f64,
}

impl Default for CenterBandClassifier {
    fn default() -> Self {
        Self { bottom_fraction: 0.6 }
    }
}

impl TriangleClassifier for CenterBandClassifier {
    fn classify(
        &self,
        contour: &Contour,
        roi_width: u32,
        roi_height: u32,
        band: &ConeCenterBand,
    ) -> Option<DetectedTriangle> {
        let points = &contour.points;
        if points.is_empty() {
            return None;
        }

        let (center_x_min, center_x_max) = band.x_range(roi_width);
        let central = points
            .iter()
            .filter(|p| p.x >= center_x_min && p.x <= center_x_max);

        let (apex, degraded) = match first_min_by(central, |p| p.y) {
            Some(apex) => {
                debug!("Peak point found in central zone: ({}, {})", apex.x, apex.y);
                (apex, false)
            }
            None => {
                let apex = first_min_by(points.iter(), |p| p.y)?;
                warn!(
                    "No contour points in center band [{:.1}, {:.1}], using highest point ({}, {})",
                    center_x_min, center_x_max, apex.x, apex.y
                );
                (apex, true)
            }
        };

        let bottom_threshold = roi_height as f64 * self.bottom_fraction;
        let mut bottom: Vec<Point> = points
            .iter()
            .copied()
            .filter(|p| p.y >= bottom_threshold)
            .collect();
        if bottom.is_empty() {
            warn!("No points below y={:.1} in ROI, using all points", bottom_threshold);
            bottom = points.clone();
        }

        let left = first_min_by(bottom.iter(), |p| p.x)?;
        let right = first_min_by(bottom.iter(), |p| -p.x)?;
        debug!(
            "Triangle points - Left: ({}, {}), Right: ({}, {}), Peak: ({}, {})",
            left.x, left.y, right.x, right.y, apex.x, apex.y
        );

        Some(DetectedTriangle {
            left,
            right,
            apex,
            degraded,
        })
    }
}

/// First point minimising `key`
fn first_min_by<'a>(points: impl Iterator<Item = &'a Point>, key: impl Fn(&Point) -> f64) -> Option<Point> {
    points.fold(None, |best: Option<Point>, p| match best {
        Some(b) if key(&b) <= key(p) => Some(b),
        _ => Some(*p),
    })
}
