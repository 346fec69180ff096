//! Bounding box types and operations.

use geo::{coord, BoundingRect, MultiPolygon, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// Axis-aligned extent in the units of whatever CRS the owning geometry
/// lives in (degrees for WGS84, meters for UTM and Web Mercator).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every point in `points`, or `None` when empty.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let mut bbox = Self::new(x0, y0, x0, y0);
        for (x, y) in iter {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        Some(bbox)
    }

    /// Bounding box of a polygon collection, `None` for an empty geometry.
    pub fn of_multi_polygon(geometry: &MultiPolygon<f64>) -> Option<Self> {
        geometry.bounding_rect().map(Self::from)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when the overlap has positive area; shared edges do not count.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        let overlap_x = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let overlap_y = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        overlap_x > 0.0 && overlap_y > 0.0
    }

    /// Like [`intersects`](Self::intersects) but shared edges and corners count.
    pub fn touches_or_intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Euclidean distance between the closest points of two boxes.
    ///
    /// Zero when the boxes overlap or touch.
    pub fn distance(&self, other: &BoundingBox) -> f64 {
        let dx = (other.min_x - self.max_x).max(self.min_x - other.max_x).max(0.0);
        let dy = (other.min_y - self.max_y).max(self.min_y - other.max_y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Grow the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> BoundingBox {
        BoundingBox::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// The box as a closed polygon (counter-clockwise exterior).
    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::from(*self).to_polygon()
    }

    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![self.to_polygon()])
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl From<BoundingBox> for Rect<f64> {
    fn from(bbox: BoundingBox) -> Self {
        Rect::new(
            coord! { x: bbox.min_x, y: bbox.min_y },
            coord! { x: bbox.max_x, y: bbox.max_y },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_and_disjoint() {
        let window = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(window.intersects(&BoundingBox::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!window.intersects(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)));
        assert!(!window.touches_or_intersects(&BoundingBox::new(20.0, 20.0, 30.0, 30.0)));
    }

    #[test]
    fn test_touching_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(1.0, 0.0, 2.0, 1.0);

        assert!(!a.intersects(&b));
        assert!(a.touches_or_intersects(&b));
        assert_eq!(a.distance(&b), 0.0);
    }

    #[test]
    fn test_distance_diagonal() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(4.0, 5.0, 6.0, 6.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
        assert!((b.distance(&a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_points() {
        let bbox = BoundingBox::from_points([(3.0, -1.0), (-2.0, 4.0), (1.0, 1.0)]).unwrap();
        assert_eq!(bbox, BoundingBox::new(-2.0, -1.0, 3.0, 4.0));
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }
}
