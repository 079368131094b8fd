//! Spatial partitioning data structures
//!
//! Every container mesh (the universe and each room) owns a dense grid of
//! boxes. Children are indexed by the boxes their swept volume touches, which
//! bounds the broad phase to a handful of neighbouring cells.

mod aabb;
mod grid;
mod side;

pub use aabb::AABB;
pub use grid::{Grid, GridBox, GridBoxId, MAX_BOXES_PER_AXIS};
pub use side::{Side, Sides};
