//! Handle types for arena-owned meshes
//!
//! Meshes reference their parent, their children and their current obstacle
//! through generational keys instead of pointers. A key that outlived its mesh
//! simply fails to resolve in the arena.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a mesh stored in a [`MeshTree`](crate::scene::MeshTree)
    pub struct MeshId;
}

/// Arena storing every mesh of the world
pub type MeshArena<T> = SlotMap<MeshId, T>;
