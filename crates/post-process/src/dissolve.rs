//! Dissolve of overlapping detections into maximal unions.

use std::fmt;
use std::str::FromStr;

use mapping_common::geometry::{buffer, overlaps_with_area, union_all};
use mapping_common::{MappingError, Props, ShapeWithProps, PROB};
use serde::{Deserialize, Serialize};

/// Property key holding the number of input shapes merged into a result.
pub const MEMBERS: &str = "members";

/// How the probability of a merged shape is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergedProbability {
    /// Mean `prob` of the shapes absorbed in the latest merge step; the
    /// accumulated shape's own probability is replaced.
    #[default]
    AbsorbedMean,
    /// Mean `prob` over every input shape in the merged result.
    RunningMean,
}

impl MergedProbability {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergedProbability::AbsorbedMean => "absorbed_mean",
            MergedProbability::RunningMean => "running_mean",
        }
    }
}

impl fmt::Display for MergedProbability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergedProbability {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "absorbed_mean" | "absorbed" => Ok(MergedProbability::AbsorbedMean),
            "running_mean" | "running" => Ok(MergedProbability::RunningMean),
            other => Err(MappingError::configuration(format!(
                "unknown merged probability policy: {}",
                other
            ))),
        }
    }
}

/// Grow every shape by `distance`, keeping its properties.
pub fn apply_buffer(shapes: &[ShapeWithProps], distance: f64) -> Vec<ShapeWithProps> {
    shapes
        .iter()
        .map(|s| s.with_geometry(buffer(&s.geometry, distance)))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Merge every group of mutually overlapping shapes into one shape.
///
/// Shapes are popped from the end of a working set. Each popped shape
/// absorbs every remaining shape it overlaps with non-zero area, and the
/// merge repeats against the grown shape until nothing overlaps it. Shapes
/// that only touch are not merged.
///
/// Shapes that never merge keep their properties. Merged shapes carry
/// `prob` (per `policy`, omitted when no member had one) and `members`.
/// With `buffer_size`, every shape is buffered first.
pub fn dissolve(
    shapes: &[ShapeWithProps],
    buffer_size: Option<f64>,
    policy: MergedProbability,
) -> Vec<ShapeWithProps> {
    let mut work = match buffer_size {
        Some(distance) if distance > 0.0 => apply_buffer(shapes, distance),
        _ => shapes.to_vec(),
    };
    let mut dissolved = Vec::new();

    while let Some(seed) = work.pop() {
        let mut geometry = seed.geometry;
        let mut prob = seed.props.get_f64(PROB);
        let mut members = 1usize;
        let mut merged = false;

        loop {
            let hits: Vec<usize> = work
                .iter()
                .enumerate()
                .filter(|(_, other)| overlaps_with_area(&geometry, &other.geometry))
                .map(|(i, _)| i)
                .collect();
            if hits.is_empty() {
                break;
            }

            // Descending, so swap_remove never moves a pending hit
            let absorbed: Vec<ShapeWithProps> =
                hits.iter().rev().map(|&i| work.swap_remove(i)).collect();

            let absorbed_mean = mean(absorbed.iter().filter_map(ShapeWithProps::prob));
            prob = match policy {
                MergedProbability::AbsorbedMean => absorbed_mean.or(prob),
                MergedProbability::RunningMean => {
                    let total = prob.unwrap_or(0.0) * members as f64
                        + absorbed.iter().filter_map(ShapeWithProps::prob).sum::<f64>();
                    let counted = members + absorbed.len();
                    (prob.is_some() || absorbed_mean.is_some()).then(|| total / counted as f64)
                }
            };

            let absorbed_geometries = absorbed.iter().map(|s| &s.geometry);
            geometry = union_all(std::iter::once(&geometry).chain(absorbed_geometries));
            members += absorbed.len();
            merged = true;
        }

        let props = if merged {
            let props = Props::new().with(MEMBERS, members);
            match prob {
                Some(p) => props.with(PROB, p),
                None => props,
            }
        } else {
            seed.props
        };
        dissolved.push(ShapeWithProps::new(geometry, props));
    }

    tracing::info!(
        input = shapes.len(),
        output = dissolved.len(),
        %policy,
        "Dissolved overlapping shapes"
    );
    dissolved
}
