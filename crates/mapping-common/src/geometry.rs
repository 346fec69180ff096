//! Exact polygon operations shared by labeling and post-processing.

use geo::{Area, BooleanOps, Buffer, MultiPolygon};

/// Area of the intersection of two geometries.
///
/// Geometries that only share an edge or a corner have zero intersection
/// area.
pub fn intersection_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    a.intersection(b).unsigned_area()
}

/// True when `a` and `b` overlap in a region of non-zero area.
pub fn overlaps_with_area(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
    intersection_area(a, b) > 0.0
}

/// Union of a sequence of geometries.
pub fn union_all<'a>(
    geometries: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
) -> MultiPolygon<f64> {
    geometries
        .into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, g| acc.union(g))
}

/// Grow a geometry by `distance` (coordinate units). Non-positive distances
/// return the geometry unchanged.
pub fn buffer(geometry: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance > 0.0 {
        geometry.buffer(distance)
    } else {
        geometry.clone()
    }
}
