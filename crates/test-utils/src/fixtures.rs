//! Common test fixtures for settlement-mapper tests.
//!
//! Detection fixtures are unit boxes laid out on a grid, which makes
//! touching, overlapping and isolated configurations easy to express.

use mapping_common::{BoundingBox, ShapeWithProps};

/// Probabilities for the 3x3 neighbor-filter scenario, row-major.
///
/// With `neighbours = 4` and `mean_threshold = 0.5` only the boxes with
/// prob 0.15 (neighbor mean 0.68) and 0.1 (neighbor mean 0.58) survive.
pub const NEIGHBOR_SCENARIO_PROBS: [f64; 9] = [0.75, 0.5, 0.5, 0.15, 0.9, 0.1, 0.75, 0.5, 0.5];

/// `rows x cols` boxes of side `size`, row-major from the origin, with
/// `spacing` between neighbors (0 = touching, negative = overlapping).
pub fn box_grid(rows: usize, cols: usize, size: f64, spacing: f64) -> Vec<BoundingBox> {
    let pitch = size + spacing;
    let mut boxes = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let x = col as f64 * pitch;
            let y = row as f64 * pitch;
            boxes.push(BoundingBox::new(x, y, x + size, y + size));
        }
    }
    boxes
}

/// Touching unit boxes.
pub fn unit_box_grid(rows: usize, cols: usize) -> Vec<BoundingBox> {
    box_grid(rows, cols, 1.0, 0.0)
}

/// Detections from boxes and matching probabilities.
pub fn detections(boxes: &[BoundingBox], probs: &[f64]) -> Vec<ShapeWithProps> {
    boxes
        .iter()
        .zip(probs)
        .map(|(b, &p)| ShapeWithProps::with_prob(b.to_multi_polygon(), p))
        .collect()
}

/// The 3x3 neighbor-filter scenario as detections.
pub fn neighbor_scenario() -> Vec<ShapeWithProps> {
    detections(&unit_box_grid(3, 3), &NEIGHBOR_SCENARIO_PROBS)
}
