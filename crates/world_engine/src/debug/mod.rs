//! Debug tools
//!
//! Text dumps of grid occupancy, taken atomically with respect to insertion
//! and removal.

pub mod grid_debug;

pub use grid_debug::{dump_container, GridDump};
