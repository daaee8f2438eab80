use cone_geometry::Point;
use geo_types::{Coord, LineString, Polygon};
use image::GrayImage;
use imageproc::contours::BorderType;
use crate::{error::Result, traits::ContourExtractor, types::Contour};

/// Imageproc-based extractor keeping outermost borders only (no holes, no nested regions)
#[derive(Debug, Clone, Default)]
pub struct ExternalContourExtractor;

impl ContourExtractor for ExternalContourExtractor {
    fn extract_contours(&self, binary_image: &GrayImage) -> Result<Vec<Contour>> {
        let contours = imageproc::contours::find_contours::<i32>(binary_image);

        let result = contours
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                let points: Vec<Point> = contour.points
                    .iter()
                    .map(|p| Point::new(p.x as f64, p.y as f64))
                    .collect();
                let area = enclosed_area(&points);
                Contour { points, area }
            })
            .collect();

        Ok(result)
    }
}

/// Area enclosed by a closed point ring
pub fn enclosed_area(points: &[Point]) -> f64 {
    use geo::Area;

    if points.len() < 3 {
        return 0.0;
    }
    let coords: Vec<Coord<f64>> = points
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect();
    Polygon::new(LineString::new(coords), vec![]).unsigned_area()
}

/// Contour with the largest enclosed area; the first one wins ties
pub fn largest_contour(contours: Vec<Contour>) -> Option<Contour> {
    contours.into_iter().fold(None, |best, contour| match best {
        Some(b) if b.area >= contour.area => Some(b),
        _ => Some(contour),
    })
}
