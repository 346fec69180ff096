//! Window enumeration and labeling scenarios.

use mapping_common::{BoundingBox, GeoTransform, Window};
use test_utils::assert_approx_eq;
use tiling::{sliding_windows, window_to_world_bounds, BoundaryPolicy, GroundTruth, WindowLabel};

fn offsets(windows: impl Iterator<Item = Window>) -> Vec<(usize, usize)> {
    windows.map(|w| (w.row_off, w.col_off)).collect()
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn test_six_by_six_stride_two() {
    let windows = offsets(sliding_windows(2, 2, 6, 6, BoundaryPolicy::StrictStride));
    assert_eq!(
        windows,
        vec![(0, 0), (0, 2), (0, 4), (2, 0), (2, 2), (2, 4), (4, 0), (4, 2), (4, 4)]
    );
}

#[test]
fn test_overlapping_windows() {
    // size 3, step 1 over 5x4: 3 columns x 2 rows
    let windows = offsets(sliding_windows(3, 1, 5, 4, BoundaryPolicy::StrictStride));
    assert_eq!(windows, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
}

#[test]
fn test_window_larger_than_raster() {
    assert_eq!(sliding_windows(8, 4, 6, 10, BoundaryPolicy::StrictStride).count(), 0);
    assert_eq!(sliding_windows(8, 4, 6, 10, BoundaryPolicy::ClipToBounds).count(), 0);
}

#[test]
fn test_strict_stride_leaves_trailing_strip() {
    let windows: Vec<Window> =
        sliding_windows(4, 4, 10, 10, BoundaryPolicy::StrictStride).collect();
    assert_eq!(windows.len(), 4);
    assert!(windows.iter().all(|w| w.col_end() <= 8 && w.row_end() <= 8));
}

#[test]
fn test_clip_to_bounds_covers_grid() {
    let windows: Vec<Window> =
        sliding_windows(4, 4, 10, 10, BoundaryPolicy::ClipToBounds).collect();
    // ceil(10 / 4) per axis
    assert_eq!(windows.len(), 9);
    assert_eq!(windows.last().map(|w| (w.row_off, w.col_off)), Some((6, 6)));
    for row in 0..10 {
        for col in 0..10 {
            let covered = windows.iter().any(|w| {
                (w.row_off..w.row_end()).contains(&row) && (w.col_off..w.col_end()).contains(&col)
            });
            assert!(covered, "pixel ({}, {}) not covered", row, col);
        }
    }
}

#[test]
fn test_windows_fit_and_are_row_major() {
    for policy in [BoundaryPolicy::StrictStride, BoundaryPolicy::ClipToBounds] {
        let grids = [(3, 2, 11, 7), (5, 5, 17, 23), (1, 3, 4, 4), (7, 7, 7, 7)];
        for (size, step, width, height) in grids {
            let windows: Vec<Window> = sliding_windows(size, step, width, height, policy).collect();
            assert!(!windows.is_empty());
            for w in &windows {
                assert!(w.fits_within(width, height), "{} outside {}x{}", w, width, height);
                assert_eq!((w.width, w.height), (size, size));
            }
            for pair in windows.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                assert!((a.row_off, a.col_off) < (b.row_off, b.col_off));
            }
        }
    }
}

// ============================================================================
// World bounds
// ============================================================================

#[test]
fn test_world_bounds_north_up_and_south_up() {
    let window = Window::square(2, 3, 4);

    let north_up = GeoTransform::from_origin(1000.0, 5000.0, 10.0, 10.0);
    let b = window_to_world_bounds(&window, &north_up);
    assert_approx_eq!(b.min_x, 1020.0, 1e-9);
    assert_approx_eq!(b.max_x, 1060.0, 1e-9);
    assert_approx_eq!(b.max_y, 4970.0, 1e-9);
    assert_approx_eq!(b.min_y, 4930.0, 1e-9);

    let south_up = GeoTransform::new(10.0, 0.0, 1000.0, 0.0, 10.0, 5000.0);
    let b = window_to_world_bounds(&window, &south_up);
    assert!(b.min_y < b.max_y);
    assert_approx_eq!(b.min_y, 5030.0, 1e-9);
}

// ============================================================================
// Labeling
// ============================================================================

#[test]
fn test_zero_area_touch_is_negative() {
    // Polygon shares only the window's right edge
    let truth = GroundTruth::new(vec![BoundingBox::new(2.0, 0.0, 3.0, 2.0).to_multi_polygon()]);
    let label = truth.label_window(&Window::square(0, 0, 2), &GeoTransform::identity());
    assert_eq!(label, WindowLabel::Negative);
}

#[test]
fn test_labels_independent_of_order() {
    let truth = GroundTruth::new(vec![
        BoundingBox::new(0.5, 0.5, 1.5, 1.5).to_multi_polygon(),
        BoundingBox::new(4.2, 4.2, 4.4, 4.4).to_multi_polygon(),
    ]);
    let t = GeoTransform::identity();
    let windows: Vec<Window> = sliding_windows(2, 2, 6, 6, BoundaryPolicy::StrictStride).collect();

    let forward: Vec<WindowLabel> = windows.iter().map(|w| truth.label_window(w, &t)).collect();
    let backward: Vec<WindowLabel> =
        windows.iter().rev().map(|w| truth.label_window(w, &t)).collect();
    assert_eq!(forward, backward.into_iter().rev().collect::<Vec<_>>());

    let (positive, negative) = truth.partition_windows(windows, &t);
    assert_eq!(offsets(positive.into_iter()), vec![(0, 0), (4, 4)]);
    assert_eq!(negative.len(), 7);
}
