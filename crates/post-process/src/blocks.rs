//! Selection of reference blocks covered by detections.

use mapping_common::geometry::{intersection_area, overlaps_with_area, union_all};
use mapping_common::{ShapeWithProps, PROB};
use spatial_index::SpatialIndex;

/// Property key holding the covered fraction of a selected block.
pub const COVERAGE: &str = "coverage";

/// Default minimum covered fraction for a block to be selected.
pub const DEFAULT_MIN_COVERAGE: f64 = 0.8;

/// Fraction of `block` covered by the union of `windows`.
pub fn block_coverage(block: &ShapeWithProps, windows: &[&ShapeWithProps]) -> f64 {
    let block_area = block.area();
    if block_area <= 0.0 {
        return 0.0;
    }
    let union = union_all(windows.iter().map(|w| &w.geometry));
    intersection_area(&union, &block.geometry) / block_area
}

/// Keep the blocks whose area is covered by detection windows for more
/// than `min_coverage`.
///
/// Only windows overlapping a block with non-zero area count toward it.
/// Selected blocks keep their properties and gain `prob`, the mean of the
/// overlapping windows' probabilities, and `coverage`.
pub fn select_blocks(
    blocks: &[ShapeWithProps],
    windows: &[ShapeWithProps],
    min_coverage: f64,
) -> Vec<ShapeWithProps> {
    let index = SpatialIndex::from_shapes(windows);
    let mut selected = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        let Some(bounds) = block.bounding_box() else {
            continue;
        };
        let hits: Vec<&ShapeWithProps> = index
            .query(&bounds)
            .into_iter()
            .map(|id| &windows[id])
            .filter(|w| overlaps_with_area(&block.geometry, &w.geometry))
            .collect();
        if hits.is_empty() {
            continue;
        }

        let coverage = block_coverage(block, &hits);
        tracing::debug!(block = i, windows = hits.len(), coverage, "Block coverage");
        if coverage <= min_coverage {
            continue;
        }

        let probs: Vec<f64> = hits.iter().filter_map(|w| w.prob()).collect();
        let mut props = block.props.clone().with(COVERAGE, coverage);
        if !probs.is_empty() {
            props = props.with(PROB, probs.iter().sum::<f64>() / probs.len() as f64);
        }
        selected.push(ShapeWithProps::new(block.geometry.clone(), props));
    }

    tracing::info!(
        blocks = blocks.len(),
        windows = windows.len(),
        selected = selected.len(),
        min_coverage,
        "Selected blocks"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapping_common::{BoundingBox, Props};
    use test_utils::assert_approx_eq;

    fn block(x0: f64, y0: f64, x1: f64, y1: f64) -> ShapeWithProps {
        ShapeWithProps::new(
            BoundingBox::new(x0, y0, x1, y1).to_multi_polygon(),
            Props::new().with("block_id", "b1"),
        )
    }

    fn window(x0: f64, y0: f64, x1: f64, y1: f64, p: f64) -> ShapeWithProps {
        ShapeWithProps::with_prob(BoundingBox::new(x0, y0, x1, y1).to_multi_polygon(), p)
    }

    #[test]
    fn test_covered_block_selected() {
        let windows = vec![window(0.0, 0.0, 1.0, 2.0, 0.6), window(1.0, 0.0, 2.0, 2.0, 0.8)];
        let selected = select_blocks(&[block(0.0, 0.0, 2.0, 2.0)], &windows, DEFAULT_MIN_COVERAGE);
        assert_eq!(selected.len(), 1);
        assert_approx_eq!(selected[0].prob().unwrap(), 0.7, 1e-12);
        assert_approx_eq!(selected[0].props.get_f64(COVERAGE).unwrap(), 1.0, 1e-9);
        assert!(selected[0].props.get("block_id").is_some());
    }

    #[test]
    fn test_partially_covered_block_rejected() {
        let windows = vec![window(0.0, 0.0, 1.0, 2.0, 0.9)];
        let selected = select_blocks(&[block(0.0, 0.0, 2.0, 2.0)], &windows, DEFAULT_MIN_COVERAGE);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_coverage_is_clipped_to_block() {
        // One large window covering 3/4 of the block and spilling far outside
        let windows = vec![window(-10.0, -10.0, 1.5, 10.0, 0.9)];
        let b = block(0.0, 0.0, 2.0, 2.0);
        let hits: Vec<&ShapeWithProps> = windows.iter().collect();
        assert_approx_eq!(block_coverage(&b, &hits), 0.75, 1e-9);
        assert!(select_blocks(&[b], &windows, DEFAULT_MIN_COVERAGE).is_empty());
    }

    #[test]
    fn test_touching_window_does_not_count() {
        let windows = vec![window(2.0, 0.0, 4.0, 2.0, 0.9), window(0.0, 0.0, 2.0, 2.0, 0.1)];
        let selected = select_blocks(&[block(0.0, 0.0, 2.0, 2.0)], &windows, DEFAULT_MIN_COVERAGE);
        assert_eq!(selected.len(), 1);
        assert_approx_eq!(selected[0].prob().unwrap(), 0.1, 1e-12);
    }
}
