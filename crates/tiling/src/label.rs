//! Ground-truth preparation and window labeling.

use geo::{Intersects, MultiPolygon};
use mapping_common::geometry::{buffer, overlaps_with_area};
use mapping_common::{BoundingBox, CrsCode, GeoTransform, MappingResult, ShapeWithProps, Window};
use spatial_index::SpatialIndex;

use crate::windows::window_multi_polygon;

/// Class of a window with respect to the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowLabel {
    Positive,
    Negative,
}

impl WindowLabel {
    /// Directory name used in the dataset layout.
    pub fn dir_name(&self) -> &'static str {
        match self {
            WindowLabel::Positive => "t",
            WindowLabel::Negative => "f",
        }
    }
}

/// Ground-truth polygons in a raster's CRS, indexed for window queries.
#[derive(Debug)]
pub struct GroundTruth {
    polygons: Vec<MultiPolygon<f64>>,
    index: SpatialIndex,
}

impl GroundTruth {
    /// Index polygons that are already in the raster CRS.
    pub fn new(polygons: Vec<MultiPolygon<f64>>) -> Self {
        let index = SpatialIndex::build(polygons.iter().map(BoundingBox::of_multi_polygon));
        Self { polygons, index }
    }

    /// Reproject `shapes` from `shapes_crs` into `raster_crs`, grow them by
    /// `buffer_size` (raster CRS units), keep those whose bounding box
    /// meets `raster_bounds`, and index the result.
    pub fn prepare(
        shapes: &[ShapeWithProps],
        shapes_crs: CrsCode,
        raster_crs: CrsCode,
        buffer_size: f64,
        raster_bounds: &BoundingBox,
    ) -> MappingResult<Self> {
        let mut polygons = Vec::new();
        for shape in shapes {
            let projected = projection::reproject(&shape.geometry, shapes_crs, raster_crs)?;
            let grown = buffer(&projected, buffer_size);
            match BoundingBox::of_multi_polygon(&grown) {
                Some(bbox) if bbox.touches_or_intersects(raster_bounds) => polygons.push(grown),
                _ => {}
            }
        }

        tracing::debug!(
            input = shapes.len(),
            kept = polygons.len(),
            %raster_crs,
            buffer_size,
            "Prepared ground truth"
        );
        Ok(Self::new(polygons))
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Positive iff some polygon overlaps `window_box` with non-zero area.
    /// A polygon that only touches the box edge does not count.
    pub fn label_box(&self, window_box: &MultiPolygon<f64>) -> WindowLabel {
        let Some(bbox) = BoundingBox::of_multi_polygon(window_box) else {
            return WindowLabel::Negative;
        };
        let positive = self
            .index
            .query(&bbox)
            .into_iter()
            .any(|id| overlaps_with_area(&self.polygons[id], window_box));
        if positive {
            WindowLabel::Positive
        } else {
            WindowLabel::Negative
        }
    }

    pub fn label_window(&self, window: &Window, transform: &GeoTransform) -> WindowLabel {
        self.label_box(&window_multi_polygon(window, transform))
    }

    /// Split windows into (positive, negative), keeping their order.
    pub fn partition_windows(
        &self,
        windows: impl IntoIterator<Item = Window>,
        transform: &GeoTransform,
    ) -> (Vec<Window>, Vec<Window>) {
        windows
            .into_iter()
            .partition(|w| self.label_window(w, transform) == WindowLabel::Positive)
    }
}

/// Area of interest limiting which windows are processed.
#[derive(Debug, Clone)]
pub struct CoverageContour {
    geometry: MultiPolygon<f64>,
}

impl CoverageContour {
    /// Reproject the union of `shapes` from `shapes_crs` into `raster_crs`.
    pub fn prepare(
        shapes: &[ShapeWithProps],
        shapes_crs: CrsCode,
        raster_crs: CrsCode,
    ) -> MappingResult<Self> {
        let mut polygons = Vec::new();
        for shape in shapes {
            let projected = projection::reproject(&shape.geometry, shapes_crs, raster_crs)?;
            polygons.extend(projected.0);
        }
        Ok(Self {
            geometry: MultiPolygon::new(polygons),
        })
    }

    /// Windows touching or overlapping the contour are kept.
    pub fn keeps(&self, window: &Window, transform: &GeoTransform) -> bool {
        self.geometry.intersects(&window_multi_polygon(window, transform))
    }
}
