//! Arena of meshes forming the world's composite tree
//!
//! [`MeshTree`] is the only writer of both sides of the grid relation: every
//! call to [`Grid::add_item`] or [`Grid::remove_mesh`] happens here and the
//! returned box list is stored on the mesh in the same call. A mesh therefore
//! always appears in exactly the boxes its `grid_boxes` list names.

use std::sync::Mutex;

use rayon::prelude::*;

use crate::foundation::collections::{MeshArena, MeshId};
use crate::foundation::math::Vec3;
use crate::foundation::sync::lock;
use crate::physics::{Border, CollisionError, ObstacleSlots, Resolution};
use crate::scene::{MeshKind, MeshNode};
use crate::spatial::Grid;

/// Counters produced while applying a frame's movement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStats {
    /// Meshes whose location changed
    pub moved: usize,
    /// Meshes stopped short by an obstacle
    pub clamped: usize,
    /// Cooldowns started
    pub cooldowns_started: usize,
}

/// Owner of every mesh in the world
#[derive(Debug, Default)]
pub struct MeshTree {
    meshes: MeshArena<MeshNode>,
    root: Option<MeshId>,
}

impl MeshTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the tree holds no mesh
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Root mesh, if any
    pub fn root(&self) -> Option<MeshId> {
        self.root
    }

    /// Insert the root; an existing root becomes a detached top-level mesh
    pub fn add_root(&mut self, node: MeshNode) -> MeshId {
        let id = self.meshes.insert(node);
        if let Some(previous) = self.root.replace(id) {
            log::warn!("Replacing root {:?} with {:?}", previous, id);
        }
        id
    }

    /// Insert `node` under `parent` and index it in the parent's grid
    pub fn add_child(&mut self, parent: MeshId, mut node: MeshNode) -> Result<MeshId, CollisionError> {
        if !self.meshes.contains_key(parent) {
            return Err(CollisionError::UnknownMesh(parent));
        }
        node.parent = Some(parent);
        let id = self.meshes.insert(node);
        lock(&self.meshes[parent].children).push(id);
        self.index_in_parent(id)?;
        Ok(id)
    }

    /// Node by id
    pub fn node(&self, id: MeshId) -> Result<&MeshNode, CollisionError> {
        self.meshes.get(id).ok_or(CollisionError::UnknownMesh(id))
    }

    /// Mutable node by id
    pub fn node_mut(&mut self, id: MeshId) -> Result<&mut MeshNode, CollisionError> {
        self.meshes.get_mut(id).ok_or(CollisionError::UnknownMesh(id))
    }

    /// Whether `id` resolves to a live mesh
    pub fn contains(&self, id: MeshId) -> bool {
        self.meshes.contains_key(id)
    }

    /// Iterate over every mesh
    pub fn iter(&self) -> impl Iterator<Item = (MeshId, &MeshNode)> {
        self.meshes.iter()
    }

    /// Border of a mesh
    pub fn border(&self, id: MeshId) -> Result<&Border, CollisionError> {
        Ok(&self.node(id)?.border)
    }

    /// Centre of a mesh
    pub fn location(&self, id: MeshId) -> Result<Vec3, CollisionError> {
        Ok(self.node(id)?.border.location())
    }

    /// Full extents of a mesh
    pub fn dimension(&self, id: MeshId) -> Result<Vec3, CollisionError> {
        Ok(self.node(id)?.border.dimension())
    }

    /// Pending movement of a mesh
    pub fn movement(&self, id: MeshId) -> Result<Vec3, CollisionError> {
        Ok(self.node(id)?.border.movement())
    }

    /// Set the movement a mesh intends to make each frame
    pub fn set_movement(&mut self, id: MeshId, movement: Vec3) -> Result<(), CollisionError> {
        self.node_mut(id)?.border.set_movement(movement);
        Ok(())
    }

    /// Grid owned by a container
    pub fn container_grid(&self, id: MeshId) -> Result<&Grid, CollisionError> {
        self.node(id)?.grid().ok_or(CollisionError::NotAContainer(id))
    }

    /// Re-index `id` in its parent's grid from its current border
    ///
    /// A parent without a grid leaves the mesh unindexed.
    pub fn index_in_parent(&self, id: MeshId) -> Result<(), CollisionError> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        let Some(grid) = self.node(parent)?.grid() else {
            return Ok(());
        };

        let mut boxes = lock(&node.grid_boxes);
        grid.remove_mesh(id, &mut boxes);
        *boxes = grid.add_item(id, &node.border);
        Ok(())
    }

    /// Clear a container's grid and index every child again
    pub fn rebuild_grid(&self, container: MeshId) -> Result<(), CollisionError> {
        let grid = self.container_grid(container)?;
        grid.reset_grid();

        let children = self.node(container)?.children();
        children.par_iter().try_for_each(|&child| -> Result<(), CollisionError> {
            let node = self.node(child)?;
            *lock(&node.grid_boxes) = grid.add_item(child, &node.border);
            Ok(())
        })
    }

    /// Containers with moving children, with those children
    ///
    /// Found by a walk from the root; meshes outside the root's subtree are
    /// not simulated.
    pub fn moved_meshes(&self) -> Vec<(MeshId, Vec<MeshId>)> {
        let mut groups = Vec::new();
        let mut stack: Vec<MeshId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.meshes.get(id) else {
                continue;
            };
            let children = node.children();
            if node.grid.is_some() {
                let moved: Vec<MeshId> = children
                    .iter()
                    .copied()
                    .filter(|&child| self.meshes.get(child).is_some_and(|c| c.border.is_moving()))
                    .collect();
                if !moved.is_empty() {
                    groups.push((id, moved));
                }
            }
            stack.extend(children);
        }

        groups
    }

    /// Forget every obstacle assignment
    pub fn reset_resolutions(&self) {
        self.meshes.values().collect::<Vec<_>>().par_iter().for_each(|node| {
            lock(&node.resolution).clear();
        });
    }

    /// Apply every mesh's movement clamped by its resolution, and run cooldowns
    ///
    /// Each mesh first ticks its running cooldown. A mesh that ends the frame
    /// with an obstacle that is not the controlled mesh then ignores that
    /// obstacle for `cooldown_frames` frames. Containers that moved get a
    /// fresh grid with their children indexed again.
    pub fn apply_movements(&mut self, cooldown_frames: u32) -> MoveStats {
        let mut stats = MoveStats::default();
        let ids: Vec<MeshId> = self.meshes.keys().collect();
        let mut moved_containers = Vec::new();

        for id in ids {
            let Some(node) = self.meshes.get(id) else {
                continue;
            };
            let resolution = node.resolution();
            let obstacle = resolution
                .obstacle
                .filter(|&o| self.meshes.get(o).is_some_and(|other| !other.controlled));

            let Some(node) = self.meshes.get_mut(id) else {
                continue;
            };
            let moving = node.border.is_moving();
            if moving && resolution.move_factor < 1.0 {
                stats.clamped += 1;
            }

            node.border.set_move_factor(resolution.move_factor);
            node.border.compute_new_location();
            if moving {
                stats.moved += 1;
                if node.grid.is_some() {
                    node.refresh_grid();
                    moved_containers.push(id);
                }
            }

            node.cooldown.tick();
            if let Some(obstacle) = obstacle {
                node.cooldown.record(obstacle, cooldown_frames);
                stats.cooldowns_started += 1;
            }
            lock(&node.resolution).clear();
        }

        for container in moved_containers {
            if let Err(e) = self.rebuild_grid(container) {
                log::warn!("Could not re-index {:?} after it moved: {}", container, e);
            }
        }

        stats
    }

    /// Move `id` under `new_parent`, updating both child lists and grids
    pub fn reparent(&mut self, id: MeshId, new_parent: MeshId) -> Result<(), CollisionError> {
        if !self.meshes.contains_key(new_parent) {
            return Err(CollisionError::UnknownMesh(new_parent));
        }
        self.detach(id)?;
        self.node_mut(id)?.parent = Some(new_parent);
        lock(&self.meshes[new_parent].children).push(id);
        self.index_in_parent(id)
    }

    /// Remove `id` from its parent's child list and grid
    fn detach(&mut self, id: MeshId) -> Result<(), CollisionError> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Ok(());
        };
        if let Some(parent_node) = self.meshes.get(parent) {
            if let Some(grid) = parent_node.grid() {
                grid.remove_mesh(id, &mut lock(&node.grid_boxes));
            }
            lock(&parent_node.children).retain(|&child| child != id);
        }
        Ok(())
    }

    /// Remove `id` and its whole subtree
    ///
    /// Returns the number of meshes removed.
    pub fn remove(&mut self, id: MeshId) -> Result<usize, CollisionError> {
        self.detach(id)?;

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.meshes.remove(current) {
                stack.extend(node.children());
                removed += 1;
            }
        }

        if self.root == Some(id) {
            self.root = None;
        }
        log::debug!("Removed {} meshes under {:?}", removed, id);
        Ok(removed)
    }

    /// Meshes of `kind` in the subtree of `id` (including `id`)
    pub fn descendants_of_kind(&self, id: MeshId, kind: MeshKind) -> Vec<MeshId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.meshes.get(current) {
                if node.kind == kind {
                    found.push(current);
                }
                stack.extend(node.children());
            }
        }
        found
    }
}

impl ObstacleSlots for MeshTree {
    fn resolution_slot(&self, mesh: MeshId) -> Option<&Mutex<Resolution>> {
        self.meshes.get(mesh).map(|node| &node.resolution)
    }

    fn is_moving(&self, mesh: MeshId) -> bool {
        self.meshes.get(mesh).is_some_and(|node| node.border.is_moving())
    }
}
