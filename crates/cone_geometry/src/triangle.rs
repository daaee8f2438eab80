use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::{
    calibration::CalibrationParams,
    cone::BaseSelectionPolicy,
    geometry::distance,
    Point,
};

/// Pick radius, in pixels, used when looking for a vertex under the cursor.
pub const DEFAULT_PICK_TOLERANCE: f64 = 10.0;

/// Coordinate frame a triangle's points are expressed in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Frame {
    /// Pixels of the full-resolution source image
    #[default]
    Original,
    /// Pixels of a resized copy shown to the user
    Display,
}

/// Triangle side names, in vertex order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter,
)]
pub enum SideLabel {
    AB,
    BC,
    CA,
}

impl SideLabel {
    /// Vertex indices joined by this side
    pub fn indices(self) -> (usize, usize) {
        match self {
            Self::AB => (0, 1),
            Self::BC => (1, 2),
            Self::CA => (2, 0),
        }
    }
}

/// Length of one side, in the triangle's frame and in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SideLength {
    pub label: SideLabel,
    pub length_px: f64,
    pub length_m: f64,
    /// Whether the base selection policy treats this side as the cone base
    pub is_base: bool,
}

/// Up to three vertices of the pile silhouette, tagged with their frame.
///
/// A triangle under construction holds 0-2 points and has no base or apex yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Triangle {
    points: Vec<Point>,
    frame: Frame,
}

impl Triangle {
    pub const VERTEX_COUNT: usize = 3;

    /// Empty triangle in the given frame
    pub fn new(frame: Frame) -> Self {
        Self {
            points: Vec::with_capacity(Self::VERTEX_COUNT),
            frame,
        }
    }

    /// Complete triangle in the original image frame
    pub fn from_points(points: [Point; 3]) -> Self {
        Self::from_points_in(points, Frame::Original)
    }

    /// Complete triangle in an explicit frame
    pub fn from_points_in(points: [Point; 3], frame: Frame) -> Self {
        Self {
            points: points.to_vec(),
            frame,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == Self::VERTEX_COUNT
    }

    /// The three vertices, if complete
    pub fn vertices(&self) -> Option<[Point; 3]> {
        match self.points.as_slice() {
            &[a, b, c] => Some([a, b, c]),
            _ => None,
        }
    }

    /// Append a vertex, evicting the oldest one when the triangle is already complete.
    ///
    /// Returns the evicted point, if any.
    pub fn add_vertex(&mut self, point: Point) -> Option<Point> {
        debug!("Adding vertex at ({:.1}, {:.1})", point.x, point.y);
        self.points.push(point);
        if self.points.len() > Self::VERTEX_COUNT {
            let removed = self.points.remove(0);
            debug!("Removed oldest vertex at ({:.1}, {:.1})", removed.x, removed.y);
            Some(removed)
        } else {
            None
        }
    }

    /// Move an existing vertex. Returns `false` when `index` is out of range.
    pub fn update_vertex(&mut self, index: usize, point: Point) -> bool {
        match self.points.get_mut(index) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    /// Replace all vertices at once, e.g. with a detection result
    pub fn replace(&mut self, points: [Point; 3], frame: Frame) {
        self.points.clear();
        self.points.extend_from_slice(&points);
        self.frame = frame;
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Index of the first vertex within `tolerance` of (x, y) along both axes
    pub fn vertex_at(&self, x: f64, y: f64, tolerance: f64) -> Option<usize> {
        self.points
            .iter()
            .position(|p| (p.x - x).abs() <= tolerance && (p.y - y).abs() <= tolerance)
    }

    /// Side lengths AB, BC, CA.
    ///
    /// Lengths are projected to metres through the same calibration path as the cone model,
    /// and `is_base` reflects the same policy. Fewer than two points yields no sides.
    pub fn sides(&self, calibration: &CalibrationParams, policy: BaseSelectionPolicy) -> Vec<SideLength> {
        let base = self.vertices().map(|v| policy.select(&v));
        let count = self.points.len();
        if count < 2 {
            return Vec::new();
        }

        let labels: &[SideLabel] = if count == 2 {
            &[SideLabel::AB]
        } else {
            &[SideLabel::AB, SideLabel::BC, SideLabel::CA]
        };

        labels
            .iter()
            .map(|&label| {
                let (i, j) = label.indices();
                let length_px = distance(self.points[i], self.points[j]);
                SideLength {
                    label,
                    length_px,
                    length_m: calibration.to_metres(length_px),
                    is_base: base.map(|b| b.side == label).unwrap_or(false),
                }
            })
            .collect()
    }

    /// Same vertices relabelled in another frame after a coordinate transform
    pub(crate) fn mapped(&self, frame: Frame, f: impl Fn(Point) -> Point) -> Self {
        Self {
            points: self.points.iter().copied().map(f).collect(),
            frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_add_vertex_evicts_oldest() {
        let mut triangle = Triangle::new(Frame::Display);
        assert!(triangle.add_vertex(p(0.0, 0.0)).is_none());
        assert!(triangle.add_vertex(p(1.0, 0.0)).is_none());
        assert!(!triangle.is_complete());
        assert!(triangle.add_vertex(p(2.0, 0.0)).is_none());
        assert!(triangle.is_complete());

        let evicted = triangle.add_vertex(p(3.0, 3.0));
        assert_eq!(evicted, Some(p(0.0, 0.0)));
        assert_eq!(triangle.points(), &[p(1.0, 0.0), p(2.0, 0.0), p(3.0, 3.0)]);
        assert_eq!(triangle.frame(), Frame::Display);
    }

    #[test]
    fn test_update_and_clear() {
        let mut triangle = Triangle::from_points([p(0.0, 0.0), p(10.0, 0.0), p(5.0, 8.0)]);
        assert!(triangle.update_vertex(2, p(5.0, 9.0)));
        assert!(!triangle.update_vertex(3, p(1.0, 1.0)));
        assert_eq!(triangle.points()[2], p(5.0, 9.0));

        triangle.clear();
        assert!(triangle.is_empty());
        assert!(triangle.vertices().is_none());
    }

    #[test]
    fn test_vertex_at_uses_box_tolerance() {
        let triangle = Triangle::from_points([p(100.0, 100.0), p(200.0, 100.0), p(150.0, 20.0)]);
        assert_eq!(triangle.vertex_at(108.0, 92.0, DEFAULT_PICK_TOLERANCE), Some(0));
        assert_eq!(triangle.vertex_at(150.0, 30.0, DEFAULT_PICK_TOLERANCE), Some(2));
        assert_eq!(triangle.vertex_at(150.0, 100.0, DEFAULT_PICK_TOLERANCE), None);
    }

    #[test]
    fn test_sides_for_partial_triangle() {
        let calibration = CalibrationParams::new(0.1, 1.0).unwrap();
        let mut triangle = Triangle::new(Frame::Original);
        assert!(triangle.sides(&calibration, BaseSelectionPolicy::default()).is_empty());

        triangle.add_vertex(p(0.0, 0.0));
        triangle.add_vertex(p(30.0, 40.0));
        let sides = triangle.sides(&calibration, BaseSelectionPolicy::default());
        assert_eq!(sides.len(), 1);
        assert!((sides[0].length_px - 50.0).abs() < 1e-9);
        assert!((sides[0].length_m - 5.0).abs() < 1e-9);
        assert!(!sides[0].is_base);
    }

    #[test]
    fn test_sides_flag_policy_base() {
        let calibration = CalibrationParams::new(0.01, 2.0).unwrap();
        let triangle = Triangle::from_points([p(0.0, 0.0), p(100.0, 0.0), p(50.0, 100.0)]);
        let sides = triangle.sides(&calibration, BaseSelectionPolicy::FixedFirstTwo);

        assert_eq!(sides.len(), 3);
        assert_eq!(sides[0].label, SideLabel::AB);
        assert!(sides[0].is_base);
        assert!(!sides[1].is_base && !sides[2].is_base);
        assert!((sides[0].length_m - 2.0).abs() < 1e-9);
    }
}
