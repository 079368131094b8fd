//! # World Engine
//!
//! Spatial grid and swept collision core for a procedurally built world of
//! rooms populated with moving objects.
//!
//! ## Features
//!
//! - **Spatial Grid**: dense box grid per container, concurrent insertion
//! - **Swept Collision**: discretized search over the pending movement
//! - **Interchangeable Backends**: serial, parallel-reduce and compute-kernel engines
//! - **Nearest Obstacle Arbitration**: one obstacle per mesh per frame, order independent
//! - **Rooms**: door and window carving from universe occupancy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use world_engine::prelude::*;
//!
//! fn main() -> Result<(), WorldError> {
//!     let mut world = World::new(WorldConfig::default())?;
//!     let room = world.tree_mut().add_root(
//!         MeshNode::new(MeshKind::Room, Border::new(Vec3::zeros(), Vec3::repeat(8.0)))
//!             .with_grid(IVec3::new(8, 8, 8)),
//!     );
//!     let cube = Border::new(Vec3::zeros(), Vec3::repeat(0.5)).with_movement(Vec3::new(0.1, 0.0, 0.0));
//!     world.tree_mut().add_child(room, MeshNode::new(MeshKind::Object, cube))?;
//!
//!     let stats = world.step()?;
//!     println!("{} meshes moved", stats.moved);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::cast_precision_loss)]

pub mod config;
pub mod debug;
pub mod foundation;
pub mod physics;
pub mod scene;
pub mod spatial;

mod world;

pub use world::{World, WorldError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        World, WorldError,
        config::{Config, CollisionConfig, GridConfig, UniverseConfig, WorldConfig},
        foundation::{
            collections::MeshId,
            math::{IVec3, Vec3},
        },
        physics::{Border, CollisionContext, CollisionEngine, CollisionError, EngineKind, FrameStats},
        scene::{carve_room_openings, MeshKind, MeshNode, MeshTree, RoomOpenings},
        spatial::{Grid, GridBoxId, Side, Sides},
    };
}
