//! Coordinate transformations and spatial indexing.
//!
//! Implements map projections and the nearest-neighbour index from scratch
//! without external geodesy dependencies.

pub mod kdtree;
pub mod lambert;

pub use kdtree::{KdTree, Neighbor};
pub use lambert::LambertConformal;
