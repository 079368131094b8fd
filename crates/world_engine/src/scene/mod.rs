//! Composite tree of meshes
//!
//! The universe owns rooms, rooms own bricks and moving objects. Containers
//! own a [`Grid`](crate::spatial::Grid) over their volume in which their
//! children are indexed.

mod mesh;
mod mesh_tree;
pub mod room;

pub use mesh::{MeshKind, MeshNode};
pub use mesh_tree::{MeshTree, MoveStats};
pub use room::{carve_room_openings, RoomOpenings};
