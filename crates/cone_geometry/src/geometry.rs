//! Frame-agnostic planar primitives.

use crate::Point;

/// Euclidean distance between two points
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    (dx * dx + dy * dy).sqrt()
}

/// Unsigned triangle area from the shoelace cross product. Zero for collinear points.
pub fn triangle_area(p1: Point, p2: Point, p3: Point) -> f64 {
    ((p2.x - p1.x) * (p3.y - p1.y) - (p3.x - p1.x) * (p2.y - p1.y)).abs() / 2.0
}

/// Height of the triangle measured from `opposite` onto the line through the base points.
///
/// Returns exactly `0.0` when the base points coincide.
pub fn triangle_height(base_p1: Point, base_p2: Point, opposite: Point) -> f64 {
    let base_length = distance(base_p1, base_p2);
    if base_length > 0.0 {
        2.0 * triangle_area(base_p1, base_p2, opposite) / base_length
    } else {
        0.0
    }
}
