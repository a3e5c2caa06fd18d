pub mod rtree;
pub use rtree::{DetectionIndex, IndexedBBox};
