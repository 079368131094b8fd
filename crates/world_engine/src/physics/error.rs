//! Collision errors

use thiserror::Error;

use crate::foundation::collections::MeshId;

/// Errors raised by collision engines and the collision pass
#[derive(Error, Debug)]
pub enum CollisionError {
    /// Granularity must be at least one step
    #[error("Invalid granularity: {0} (must be at least 1)")]
    InvalidGranularity(u32),

    /// The accelerator backend was requested but not compiled in
    #[error("Accelerator backend unavailable: rebuild with the `accelerator` feature")]
    AcceleratorUnavailable,

    /// No usable device, or the kernel failed to build
    #[error("Accelerator initialization failed: {0}")]
    AcceleratorInit(String),

    /// Dispatch or read-back failed
    #[error("Accelerator error: {0}")]
    Accelerator(String),

    /// Grid dimensions that cannot be built
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// The id does not resolve to a live mesh
    #[error("Unknown mesh: {0:?}")]
    UnknownMesh(MeshId),

    /// The mesh owns no grid
    #[error("Mesh {0:?} is not a container")]
    NotAContainer(MeshId),
}
