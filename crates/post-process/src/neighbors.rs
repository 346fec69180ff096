//! Neighborhood smoothing of detection probabilities.

use mapping_common::{ShapeWithProps, PROB, PROB_MEAN};
use spatial_index::SpatialIndex;

/// Mean `prob` of the detections adjacent to detection `id`.
///
/// Candidates are the entries tied for nearest to the detection's bounds,
/// that is every detection touching or overlapping it, minus the detection
/// itself. Fewer than `neighbours` candidates gives 0. Otherwise the mean is
/// taken over all candidates. Candidates without a `prob` count as 0.
pub fn mean_neighbor_probability(
    id: usize,
    detections: &[ShapeWithProps],
    index: &SpatialIndex,
    neighbours: usize,
) -> f64 {
    let Some(bounds) = index.bbox(id) else {
        return 0.0;
    };
    let candidates: Vec<usize> = index
        .nearest(bounds, 1)
        .into_iter()
        .filter(|&other| other != id)
        .collect();

    if candidates.is_empty() || candidates.len() < neighbours {
        return 0.0;
    }
    let total: f64 = candidates
        .iter()
        .map(|&other| detections[other].prob().unwrap_or(0.0))
        .sum();
    total / candidates.len() as f64
}

/// Attach `prob_mean` to every detection and keep those with
/// `prob_mean > mean_threshold`, in input order.
pub fn filter_by_mean_neighbor_probability(
    detections: &[ShapeWithProps],
    neighbours: usize,
    mean_threshold: f64,
) -> Vec<ShapeWithProps> {
    let index = SpatialIndex::from_shapes(detections);

    let kept: Vec<ShapeWithProps> = detections
        .iter()
        .enumerate()
        .filter_map(|(id, detection)| {
            let prob_mean = mean_neighbor_probability(id, detections, &index, neighbours);
            (prob_mean > mean_threshold).then(|| detection.with_prop(PROB_MEAN, prob_mean))
        })
        .collect();

    tracing::info!(
        input = detections.len(),
        kept = kept.len(),
        neighbours,
        mean_threshold,
        "Filtered detections by neighbor probability"
    );
    kept
}
