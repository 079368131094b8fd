//! Swept collision detection and obstacle resolution
//!
//! Geometry lives in [`Border`]; the discretized search in
//! [`CollisionEngine`]; the choice of exactly one nearest obstacle per mesh
//! in the [`arbitration`] module; and the per-frame pass tying them to the
//! spatial grid in [`CollisionContext`].

pub mod arbitration;
pub mod border;
pub mod collision_system;
pub mod engine;
mod error;

#[cfg(feature = "accelerator")]
pub mod accelerator;

#[cfg(test)]
mod collision_engine_tests;

pub use arbitration::{Arbiter, Commit, Cooldown, ObstacleSlots, Resolution};
pub use border::Border;
pub use collision_system::{CollisionContext, Detection, FrameStats};
pub use engine::{CollisionEngine, EngineKind};
pub use error::CollisionError;

#[cfg(feature = "accelerator")]
pub use accelerator::AcceleratorEngine;
