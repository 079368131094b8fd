//! Frame loop
//!
//! A frame runs to completion in four phases: grids of containers with moving
//! children are rebuilt, every such container runs its collision pass in
//! parallel, movement is applied clamped by the chosen obstacles, and meshes
//! that left their container are re-homed or bounced.

use rayon::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, WorldConfig};
use crate::foundation::collections::MeshId;
use crate::physics::{CollisionContext, CollisionError, FrameStats};
use crate::scene::MeshTree;

/// Errors raised while building or stepping a world
#[derive(Error, Debug)]
pub enum WorldError {
    /// Collision engine or mesh lookup failure
    #[error("Collision error: {0}")]
    Collision(#[from] CollisionError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Meshes plus the collision context that moves them
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    context: CollisionContext,
    tree: MeshTree,
    frame: u64,
}

impl World {
    /// Validate `config` and build its collision engine
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let context = CollisionContext::new(&config.collision)?;
        Ok(Self {
            config,
            context,
            tree: MeshTree::new(),
            frame: 0,
        })
    }

    /// Configuration the world was built from
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Collision context
    pub fn context(&self) -> &CollisionContext {
        &self.context
    }

    /// Mesh tree
    pub fn tree(&self) -> &MeshTree {
        &self.tree
    }

    /// Mesh tree, for content generators and movement input
    pub fn tree_mut(&mut self) -> &mut MeshTree {
        &mut self.tree
    }

    /// Frames completed so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame
    pub fn step(&mut self) -> Result<FrameStats, WorldError> {
        let groups = self.tree.moved_meshes();
        self.tree.reset_resolutions();

        let tree = &self.tree;
        groups
            .par_iter()
            .try_for_each(|(container, _)| tree.rebuild_grid(*container))?;

        let context = &self.context;
        let passes = groups
            .par_iter()
            .map(|(container, moved)| context.run_container_pass(tree, *container, moved))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = FrameStats::default();
        for pass in passes {
            stats += pass;
        }

        let moves = self.tree.apply_movements(self.context.cooldown_frames());

        for (container, moved) in &groups {
            for &mesh in moved {
                self.keep_inside(*container, mesh, &mut stats)?;
            }
        }

        self.frame += 1;
        log::debug!(
            "Frame {}: {} moved ({} clamped), {} pairs, {} committed, {} skipped, {} requeued, {} rehomed, {} bounced",
            self.frame,
            stats.moved,
            moves.clamped,
            stats.pairs_tested,
            stats.committed,
            stats.skipped,
            stats.requeued,
            stats.rehomed,
            stats.bounced
        );
        Ok(stats)
    }

    /// Run `frames` frames and sum their statistics
    pub fn run(&mut self, frames: u64) -> Result<FrameStats, WorldError> {
        let mut total = FrameStats::default();
        for _ in 0..frames {
            total += self.step()?;
        }
        Ok(total)
    }

    /// Move `mesh` to a sibling of `container` that holds its location, or bounce it
    fn keep_inside(&mut self, container: MeshId, mesh: MeshId, stats: &mut FrameStats) -> Result<(), WorldError> {
        if !self.tree.contains(mesh) {
            return Ok(());
        }
        let location = self.tree.location(mesh)?;
        if self.tree.container_grid(container)?.is_inside(location) {
            return Ok(());
        }

        let target = self.tree.node(container)?.parent().and_then(|grandparent| {
            let siblings = self.tree.node(grandparent).ok()?.children();
            siblings.into_iter().find(|&sibling| {
                sibling != container
                    && self
                        .tree
                        .node(sibling)
                        .ok()
                        .and_then(|node| node.grid())
                        .is_some_and(|grid| grid.is_inside(location))
            })
        });

        if let Some(target) = target {
            log::trace!("{:?} moves from {:?} to {:?}", mesh, container, target);
            self.tree.reparent(mesh, target)?;
            stats.rehomed += 1;
        } else {
            log::trace!("{:?} bounces off the edge of {:?}", mesh, container);
            let movement = self.tree.movement(mesh)?;
            self.tree.set_movement(mesh, -movement)?;
            stats.bounced += 1;
        }
        Ok(())
    }
}
