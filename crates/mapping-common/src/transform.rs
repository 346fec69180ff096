//! Affine pixel-to-world transforms.
//!
//! Follows the six-coefficient convention used by GeoTIFF model
//! transformations:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! North-up rasters have `e < 0` (rows grow southwards).

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Window};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform with the top-left corner at (`west`, `north`).
    pub fn from_origin(west: f64, north: f64, x_res: f64, y_res: f64) -> Self {
        Self::new(x_res, 0.0, west, 0.0, -y_res, north)
    }

    /// Identity transform (world coordinates equal pixel coordinates).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// World coordinates of a pixel-space position (corner convention).
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// Pixel-space position of a world coordinate, `None` for a singular transform.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.a * self.e - self.b * self.d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = x - self.c;
        let dy = y - self.f;
        Some((
            (self.e * dx - self.b * dy) / det,
            (self.a * dy - self.d * dx) / det,
        ))
    }

    /// World bounding box of a window.
    ///
    /// All four corners are mapped and min/max taken per axis, so the result
    /// is ordered correctly for negative or positive Y scale and for rotated
    /// transforms.
    pub fn window_bounds(&self, window: &Window) -> BoundingBox {
        let c0 = window.col_off as f64;
        let r0 = window.row_off as f64;
        let c1 = window.col_end() as f64;
        let r1 = window.row_end() as f64;

        let corners = [
            self.apply(c0, r0),
            self.apply(c1, r0),
            self.apply(c1, r1),
            self.apply(c0, r1),
        ];
        // Four corners are always present
        BoundingBox::from_points(corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }

    /// World bounding box of a whole `width x height` raster.
    pub fn raster_bounds(&self, width: usize, height: usize) -> BoundingBox {
        self.window_bounds(&Window::new(0, 0, width, height))
    }

    /// Size of a pixel along each axis in world units.
    pub fn resolution(&self) -> (f64, f64) {
        (
            (self.a * self.a + self.d * self.d).sqrt(),
            (self.b * self.b + self.e * self.e).sqrt(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_up_window_bounds() {
        // 10m pixels, top-left at (500000, 6000000)
        let t = GeoTransform::from_origin(500_000.0, 6_000_000.0, 10.0, 10.0);
        let bbox = t.window_bounds(&Window::square(2, 3, 4));

        assert_eq!(bbox.min_x, 500_020.0);
        assert_eq!(bbox.max_x, 500_060.0);
        assert_eq!(bbox.max_y, 5_999_970.0);
        assert_eq!(bbox.min_y, 5_999_930.0);
    }

    #[test]
    fn test_south_up_window_bounds() {
        let t = GeoTransform::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let bbox = t.window_bounds(&Window::square(2, 3, 4));
        assert_eq!(bbox, BoundingBox::new(2.0, 3.0, 6.0, 7.0));
    }

    #[test]
    fn test_invert_roundtrip() {
        let t = GeoTransform::new(0.5, 0.1, 100.0, -0.2, -0.5, 40.0);
        let (x, y) = t.apply(12.0, 7.0);
        let (col, row) = t.invert(x, y).unwrap();
        assert!((col - 12.0).abs() < 1e-9);
        assert!((row - 7.0).abs() < 1e-9);
    }
}
