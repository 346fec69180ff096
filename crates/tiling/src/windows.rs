//! Sliding-window enumeration over a raster grid.

use std::fmt;
use std::str::FromStr;

use geo::{LineString, MultiPolygon, Polygon};
use mapping_common::{BoundingBox, GeoTransform, MappingError, MappingResult, Window};
use serde::{Deserialize, Serialize};

/// How the last window on each axis is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Offsets `0, step, 2*step, ...` while the window fits. A trailing
    /// strip narrower than the stride may go unscanned.
    #[default]
    StrictStride,
    /// Like `StrictStride`, plus one window flush with the far edge when
    /// the stride does not land on it.
    ClipToBounds,
}

impl BoundaryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryPolicy::StrictStride => "strict_stride",
            BoundaryPolicy::ClipToBounds => "clip_to_bounds",
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryPolicy {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict_stride" | "strict" => Ok(BoundaryPolicy::StrictStride),
            "clip_to_bounds" | "clip" => Ok(BoundaryPolicy::ClipToBounds),
            other => Err(MappingError::configuration(format!(
                "unknown boundary policy: {}",
                other
            ))),
        }
    }
}

/// Window offsets along one axis of length `extent`.
pub fn axis_offsets(size: usize, step: usize, extent: usize, policy: BoundaryPolicy) -> Vec<usize> {
    if size == 0 || step == 0 || size > extent {
        return Vec::new();
    }
    let last = extent - size;
    let mut offsets: Vec<usize> = (0..=last).step_by(step).collect();
    if policy == BoundaryPolicy::ClipToBounds && offsets.last() != Some(&last) {
        offsets.push(last);
    }
    offsets
}

/// Lazy row-major iterator over `size x size` windows.
#[derive(Debug, Clone)]
pub struct SlidingWindows {
    size: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    next: usize,
}

impl SlidingWindows {
    /// Total number of windows, including those already yielded.
    pub fn total(&self) -> usize {
        self.rows.len() * self.cols.len()
    }
}

impl Iterator for SlidingWindows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.cols.is_empty() || self.next >= self.total() {
            return None;
        }
        let row_off = self.rows[self.next / self.cols.len()];
        let col_off = self.cols[self.next % self.cols.len()];
        self.next += 1;
        Some(Window::square(col_off, row_off, self.size))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SlidingWindows {}

/// Windows of `size x size` pixels over a `width x height` grid, stepping
/// `step` pixels, in row-major order (rows outer, columns inner).
///
/// Every window lies fully inside the grid; an axis shorter than `size`
/// yields no windows. Zero `size` or `step` also yields nothing; configs
/// reject those values up front.
pub fn sliding_windows(
    size: usize,
    step: usize,
    width: usize,
    height: usize,
    policy: BoundaryPolicy,
) -> SlidingWindows {
    SlidingWindows {
        size,
        rows: axis_offsets(size, step, height, policy),
        cols: axis_offsets(size, step, width, policy),
        next: 0,
    }
}

/// Reject zero window sizes and strides.
pub fn validate_window_params(size: usize, step: usize) -> MappingResult<()> {
    if size == 0 {
        return Err(MappingError::configuration("window size must be positive"));
    }
    if step == 0 {
        return Err(MappingError::configuration("step size must be positive"));
    }
    Ok(())
}

/// World bounding box of a window; see [`GeoTransform::window_bounds`].
pub fn window_to_world_bounds(window: &Window, transform: &GeoTransform) -> BoundingBox {
    transform.window_bounds(window)
}

/// Georeferenced outline of a window: its four pixel corners mapped
/// through the affine transform.
pub fn window_polygon(window: &Window, transform: &GeoTransform) -> Polygon<f64> {
    let (c0, r0) = (window.col_off as f64, window.row_off as f64);
    let (c1, r1) = (window.col_end() as f64, window.row_end() as f64);
    let corners = [(c0, r0), (c1, r0), (c1, r1), (c0, r1), (c0, r0)];
    let ring: LineString<f64> = corners
        .iter()
        .map(|&(col, row)| transform.apply(col, row))
        .collect::<Vec<_>>()
        .into();
    Polygon::new(ring, Vec::new())
}

pub fn window_multi_polygon(window: &Window, transform: &GeoTransform) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![window_polygon(window, transform)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_offsets_strict() {
        assert_eq!(axis_offsets(2, 2, 6, BoundaryPolicy::StrictStride), vec![0, 2, 4]);
        assert_eq!(axis_offsets(3, 2, 6, BoundaryPolicy::StrictStride), vec![0, 2]);
        assert_eq!(axis_offsets(6, 2, 6, BoundaryPolicy::StrictStride), vec![0]);
        assert!(axis_offsets(7, 2, 6, BoundaryPolicy::StrictStride).is_empty());
    }

    #[test]
    fn test_axis_offsets_clip_adds_edge_window() {
        assert_eq!(axis_offsets(3, 2, 6, BoundaryPolicy::ClipToBounds), vec![0, 2, 3]);
        // Already flush with the edge
        assert_eq!(axis_offsets(2, 2, 6, BoundaryPolicy::ClipToBounds), vec![0, 2, 4]);
        assert!(axis_offsets(7, 2, 6, BoundaryPolicy::ClipToBounds).is_empty());
    }

    #[test]
    fn test_zero_params_yield_nothing() {
        assert_eq!(sliding_windows(0, 2, 6, 6, BoundaryPolicy::StrictStride).count(), 0);
        assert_eq!(sliding_windows(2, 0, 6, 6, BoundaryPolicy::StrictStride).count(), 0);
        assert!(validate_window_params(0, 2).is_err());
        assert!(validate_window_params(2, 0).is_err());
        assert!(validate_window_params(2, 2).is_ok());
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!(
            "clip-to-bounds".parse::<BoundaryPolicy>().unwrap(),
            BoundaryPolicy::ClipToBounds
        );
        assert_eq!(BoundaryPolicy::default().to_string(), "strict_stride");
        assert!("diagonal".parse::<BoundaryPolicy>().is_err());
    }

    #[test]
    fn test_exact_size() {
        let windows = sliding_windows(2, 1, 4, 3, BoundaryPolicy::StrictStride);
        assert_eq!(windows.len(), 6);
    }
}
