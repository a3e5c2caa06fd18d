//! Bounding-box overlap index over a batch of detections.
//!
//! Detection boxes are bulk-loaded into an R*-tree and queried with
//! `locate_in_envelope_intersecting`, so each overlap lookup only touches
//! boxes whose envelopes meet the query envelope instead of the whole batch.
//!
//! Results are returned in ascending detection index order, not in the tree
//! order the R*-tree yields them in.
//!
//! ## Example
//!
//! ```rust
//! use nestlink::compute::spatial::DetectionIndex;
//! use nestlink_types::bbox::BoundingBox2D;
//!
//! let boxes = vec![
//!     BoundingBox2D::new(0.0, 0.0, 2.0, 2.0),
//!     BoundingBox2D::new(1.0, 1.0, 3.0, 3.0),
//!     BoundingBox2D::new(9.0, 9.0, 10.0, 10.0),
//! ];
//! let index = DetectionIndex::from_boxes(&boxes);
//! assert_eq!(index.query_overlapping(&boxes[0]), vec![0, 1]);
//! ```

use nestlink_types::bbox::BoundingBox2D;
use rstar::{AABB, RTree, RTreeObject};

/// Indexed bounding box for the R*-tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Position of the detection in the batch
    pub index: usize,
}

impl IndexedBBox {
    pub fn new(bbox: &BoundingBox2D, index: usize) -> Self {
        Self {
            min_x: bbox.min_x(),
            min_y: bbox.min_y(),
            max_x: bbox.max_x(),
            max_y: bbox.max_y(),
            index,
        }
    }
}

impl RTreeObject for IndexedBBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// Spatial index over one batch of detection boxes.
pub struct DetectionIndex {
    tree: RTree<IndexedBBox>,
}

impl DetectionIndex {
    /// Bulk-load an index; entry `i` refers to `boxes[i]`.
    ///
    /// Boxes with non-finite corners are left out of the index and so never
    /// appear in query results.
    pub fn from_boxes(boxes: &[BoundingBox2D]) -> Self {
        let objects: Vec<IndexedBBox> = boxes
            .iter()
            .enumerate()
            .filter_map(|(index, bbox)| {
                if bbox.is_finite() {
                    Some(IndexedBBox::new(bbox, index))
                } else {
                    log::warn!("Leaving detection {} out of the index: non-finite box", index);
                    None
                }
            })
            .collect();

        Self {
            tree: RTree::bulk_load(objects),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of all boxes whose envelope intersects `bbox`, ascending.
    ///
    /// Touching boxes count as overlapping. A box overlaps itself, so a query
    /// with an indexed box includes that box's own index.
    pub fn query_overlapping(&self, bbox: &BoundingBox2D) -> Vec<usize> {
        if !bbox.is_finite() {
            log::warn!("Rejecting bounding box query with non-finite coordinates");
            return Vec::new();
        }

        let envelope = AABB::from_corners([bbox.min_x(), bbox.min_y()], [bbox.max_x(), bbox.max_y()]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.index)
            .collect();
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_returns_sorted_overlaps() {
        let boxes = vec![
            BoundingBox2D::new(5.0, 5.0, 6.0, 6.0),
            BoundingBox2D::new(0.0, 0.0, 2.0, 2.0),
            BoundingBox2D::new(1.5, 1.5, 5.5, 5.5),
            BoundingBox2D::new(20.0, 20.0, 21.0, 21.0),
        ];
        let index = DetectionIndex::from_boxes(&boxes);

        assert_eq!(index.len(), 4);
        assert_eq!(index.query_overlapping(&boxes[2]), vec![0, 1, 2]);
        assert_eq!(index.query_overlapping(&boxes[3]), vec![3]);
    }

    #[test]
    fn test_touching_boxes_overlap() {
        let boxes = vec![
            BoundingBox2D::new(0.0, 0.0, 1.0, 1.0),
            BoundingBox2D::new(1.0, 1.0, 2.0, 2.0),
        ];
        let index = DetectionIndex::from_boxes(&boxes);
        assert_eq!(index.query_overlapping(&boxes[0]), vec![0, 1]);
    }

    #[test]
    fn test_non_finite_boxes_skipped() {
        let boxes = vec![
            BoundingBox2D::new(0.0, 0.0, 1.0, 1.0),
            BoundingBox2D::new(f64::NAN, 0.0, 1.0, 1.0),
        ];
        let index = DetectionIndex::from_boxes(&boxes);

        assert_eq!(index.len(), 1);
        assert!(index.query_overlapping(&boxes[1]).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let index = DetectionIndex::from_boxes(&[]);
        assert!(index.is_empty());
        assert!(
            index
                .query_overlapping(&BoundingBox2D::new(0.0, 0.0, 1.0, 1.0))
                .is_empty()
        );
    }
}
