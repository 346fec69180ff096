//! Bounding-box spatial index over a fixed list of geometries.
//!
//! The index is built once from a list and maps every entry back to its
//! position in that list. It is never mutated: callers whose geometry list
//! changes build a new index.
//!
//! Queries return candidate sets only. Exact geometric tests against the
//! returned entries are the caller's job.

use std::collections::BTreeSet;

use mapping_common::{BoundingBox, ShapeWithProps};
use rstar::{RTree, RTreeObject, AABB};

/// One index entry: the bounding box of the geometry at `id`.
#[derive(Debug, Clone)]
struct IndexedBox {
    id: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y])
}

/// R-tree over bounding boxes, keyed by position in the source list.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
    /// Bounding box per id; `None` for entries without geometry.
    boxes: Vec<Option<BoundingBox>>,
    /// Extent of every indexed box.
    extent: Option<BoundingBox>,
}

impl SpatialIndex {
    /// Bulk-load an index from bounding boxes. Entry ids are the positions
    /// in the iterator; `None` entries keep their id but are never returned.
    pub fn build<I>(bboxes: I) -> Self
    where
        I: IntoIterator<Item = Option<BoundingBox>>,
    {
        let boxes: Vec<Option<BoundingBox>> = bboxes.into_iter().collect();

        let entries: Vec<IndexedBox> = boxes
            .iter()
            .enumerate()
            .filter_map(|(id, bbox)| {
                bbox.as_ref().map(|b| IndexedBox {
                    id,
                    envelope: to_aabb(b),
                })
            })
            .collect();

        let extent = BoundingBox::from_points(
            boxes
                .iter()
                .flatten()
                .flat_map(|b| [(b.min_x, b.min_y), (b.max_x, b.max_y)]),
        );

        tracing::debug!(entries = entries.len(), "Building spatial index");

        Self {
            tree: RTree::bulk_load(entries),
            boxes,
            extent,
        }
    }

    /// Index the bounding boxes of a shape list.
    pub fn from_shapes(shapes: &[ShapeWithProps]) -> Self {
        Self::build(shapes.iter().map(ShapeWithProps::bounding_box))
    }

    /// Number of indexed entries (entries without geometry excluded).
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Bounding box stored for `id`.
    pub fn bbox(&self, id: usize) -> Option<&BoundingBox> {
        self.boxes.get(id).and_then(Option::as_ref)
    }

    /// Ids of every entry whose bounding box intersects `bbox`.
    ///
    /// Boxes sharing only an edge or a corner with the query are included.
    pub fn query(&self, bbox: &BoundingBox) -> BTreeSet<usize> {
        self.tree
            .locate_in_envelope_intersecting(&to_aabb(bbox))
            .map(|entry| entry.id)
            .collect()
    }

    /// The `k` entries nearest to `bbox` by box-to-box distance, plus every
    /// further entry tied with the k-th distance.
    ///
    /// Entries overlapping the query are at distance zero, so the query's
    /// own entry (if indexed) is part of the result. The result is ordered
    /// by distance, then id, and may hold more than `k` ids when ties occur.
    pub fn nearest(&self, bbox: &BoundingBox, k: usize) -> Vec<usize> {
        let total = self.len();
        let Some(extent) = self.extent else {
            return Vec::new();
        };
        if k == 0 || total == 0 {
            return Vec::new();
        }
        let need = k.min(total);

        let mut radius = 0.0_f64;
        let step = initial_search_radius(&extent, total);

        loop {
            let mut candidates: Vec<(f64, usize)> = self
                .tree
                .locate_in_envelope_intersecting(&to_aabb(&bbox.expand(radius)))
                .map(|entry| (self.distance_to(entry.id, bbox), entry.id))
                .collect();

            // Every entry at distance <= radius intersects the expanded envelope,
            // so once `need` of them are found the k-th distance and all its ties
            // are known.
            let within = candidates.iter().filter(|(d, _)| *d <= radius).count();
            if within >= need || candidates.len() == total {
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                let kth = candidates[need - 1].0;
                return candidates
                    .into_iter()
                    .take_while(|(d, _)| *d <= kth)
                    .map(|(_, id)| id)
                    .collect();
            }

            radius = if radius == 0.0 { step } else { radius * 2.0 };
        }
    }

    fn distance_to(&self, id: usize, bbox: &BoundingBox) -> f64 {
        self.bbox(id).map_or(f64::INFINITY, |b| b.distance(bbox))
    }
}

/// First non-zero search radius: roughly the spacing of a uniform grid of
/// `count` boxes over `extent`.
fn initial_search_radius(extent: &BoundingBox, count: usize) -> f64 {
    let span = extent.width().max(extent.height());
    let radius = span / (count as f64).sqrt();
    if radius.is_finite() && radius > 0.0 {
        radius
    } else {
        1.0
    }
}
