//! Per-frame collision pass
//!
//! [`CollisionContext`] is built once from configuration and passed by
//! reference to everything that tests pairs. It owns the engine and the
//! arbiter; no collision state is global.
//!
//! Within a container every moved mesh is processed in parallel: it fetches
//! its grid neighbours, tests each pair through the engine outside any lock,
//! and hands hits to the arbiter. Meshes displaced from a pairing are
//! re-queued for another round in the same frame.

use std::collections::HashSet;
use std::ops::AddAssign;

use rayon::prelude::*;

use crate::config::CollisionConfig;
use crate::foundation::collections::MeshId;
use crate::physics::arbitration::{Arbiter, Commit};
use crate::physics::{CollisionEngine, CollisionError};
use crate::scene::MeshTree;

/// What happened to one tested pair
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// The obstacle is under cooldown for the target
    Skipped,
    /// No step of the movement overlaps
    Clear,
    /// A hit that was not nearer than what either side holds
    Rejected(f32),
    /// A hit recorded as the nearest obstacle of both sides
    Committed {
        /// Safe fraction of movement
        fraction: f32,
        /// Moving meshes that lost their pairing
        displaced: Vec<MeshId>,
    },
}

/// Counters for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Meshes with a pending movement
    pub moved: usize,
    /// Pairs handed to the engine
    pub pairs_tested: usize,
    /// Pairs skipped by cooldown
    pub skipped: usize,
    /// Commits accepted by the arbiter
    pub committed: usize,
    /// Meshes re-queued after losing a pairing
    pub requeued: usize,
    /// Re-queue rounds run on top of the first pass
    pub extra_rounds: usize,
    /// Meshes moved into a sibling container
    pub rehomed: usize,
    /// Meshes bounced back at the world edge
    pub bounced: usize,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, other: Self) {
        self.moved += other.moved;
        self.pairs_tested += other.pairs_tested;
        self.skipped += other.skipped;
        self.committed += other.committed;
        self.requeued += other.requeued;
        self.extra_rounds += other.extra_rounds;
        self.rehomed += other.rehomed;
        self.bounced += other.bounced;
    }
}

/// Collision engine plus arbitration state for one world
#[derive(Debug)]
pub struct CollisionContext {
    engine: CollisionEngine,
    arbiter: Arbiter,
    cooldown_frames: u32,
    max_requeue_rounds: u32,
}

impl CollisionContext {
    /// Build the configured engine
    pub fn new(config: &CollisionConfig) -> Result<Self, CollisionError> {
        let engine = CollisionEngine::new(config.engine, config.granularity)?;
        Ok(Self::with_engine(engine, config.cooldown_frames, config.max_requeue_rounds))
    }

    /// Wrap an already built engine
    pub fn with_engine(engine: CollisionEngine, cooldown_frames: u32, max_requeue_rounds: u32) -> Self {
        Self {
            engine,
            arbiter: Arbiter::new(),
            cooldown_frames,
            max_requeue_rounds: max_requeue_rounds.max(1),
        }
    }

    /// Engine in use
    pub fn engine(&self) -> &CollisionEngine {
        &self.engine
    }

    /// Frames an obstacle is ignored after a collision
    pub fn cooldown_frames(&self) -> u32 {
        self.cooldown_frames
    }

    /// Test `target` against `obstacle` and record the hit if it is the nearest
    pub fn detect_collision(&self, tree: &MeshTree, target: MeshId, obstacle: MeshId) -> Result<Detection, CollisionError> {
        let target_node = tree.node(target)?;
        if target_node.cooldown().is_blocking(obstacle) {
            return Ok(Detection::Skipped);
        }

        let obstacle_node = tree.node(obstacle)?;
        let fraction = self
            .engine
            .compute_collision(target_node.border(), obstacle_node.border())?;
        if fraction == 1.0 {
            return Ok(Detection::Clear);
        }

        match self.arbiter.commit(tree, target, obstacle, fraction)? {
            Commit::Rejected => Ok(Detection::Rejected(fraction)),
            Commit::Committed { displaced } => Ok(Detection::Committed { fraction, displaced }),
        }
    }

    /// Test one moved mesh against every grid neighbour in `container`
    fn test_mesh(&self, tree: &MeshTree, container: MeshId, mesh: MeshId) -> Result<(FrameStats, Vec<MeshId>), CollisionError> {
        let grid = tree.container_grid(container)?;
        let node = tree.node(mesh)?;
        let neighbors = grid.find_collision_neighbors(mesh, &node.grid_boxes(), &node.border().movement());

        let mut stats = FrameStats::default();
        let mut displaced = Vec::new();
        for neighbor in neighbors {
            match self.detect_collision(tree, mesh, neighbor)? {
                Detection::Skipped => stats.skipped += 1,
                Detection::Clear | Detection::Rejected(_) => stats.pairs_tested += 1,
                Detection::Committed { displaced: lost, .. } => {
                    stats.pairs_tested += 1;
                    stats.committed += 1;
                    displaced.extend(lost);
                }
            }
        }
        Ok((stats, displaced))
    }

    /// Run the collision pass for the moved children of one container
    ///
    /// The container's grid must already index its children for this frame.
    pub fn run_container_pass(&self, tree: &MeshTree, container: MeshId, moved: &[MeshId]) -> Result<FrameStats, CollisionError> {
        let mut stats = FrameStats {
            moved: moved.len(),
            ..FrameStats::default()
        };

        let mut queue: Vec<MeshId> = moved.to_vec();
        for round in 0..self.max_requeue_rounds {
            if queue.is_empty() {
                break;
            }
            if round > 0 {
                stats.extra_rounds += 1;
            }

            let outcomes = queue
                .par_iter()
                .map(|&mesh| self.test_mesh(tree, container, mesh))
                .collect::<Result<Vec<_>, _>>()?;

            let mut next = HashSet::new();
            for (mesh_stats, displaced) in outcomes {
                stats += mesh_stats;
                next.extend(displaced);
            }
            stats.requeued += next.len();
            queue = next.into_iter().collect();
        }

        if !queue.is_empty() {
            log::warn!(
                "{} meshes still displaced in {:?} after {} rounds",
                queue.len(), container, self.max_requeue_rounds
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{IVec3, Vec3};
    use crate::foundation::sync::lock;
    use crate::physics::{Border, EngineKind, Resolution};
    use crate::scene::{MeshKind, MeshNode};

    fn room_tree() -> (MeshTree, MeshId) {
        let mut tree = MeshTree::new();
        let room = tree.add_root(
            MeshNode::new(MeshKind::Room, Border::new(Vec3::zeros(), Vec3::new(8.0, 8.0, 8.0)))
                .with_grid(IVec3::new(4, 4, 4)),
        );
        (tree, room)
    }

    fn cube(tree: &mut MeshTree, room: MeshId, x: f32, movement: Vec3) -> MeshId {
        let border = Border::new(Vec3::new(x, 0.5, 0.5), Vec3::new(0.5, 0.5, 0.5)).with_movement(movement);
        tree.add_child(room, MeshNode::new(MeshKind::Object, border)).unwrap()
    }

    fn context(kind: EngineKind) -> CollisionContext {
        CollisionContext::new(&CollisionConfig::new(kind).with_granularity(10)).unwrap()
    }

    #[test]
    fn test_detect_commits_and_skips_clear_pairs() {
        let (mut tree, room) = room_tree();
        let a = cube(&mut tree, room, 0.0, Vec3::new(2.0, 0.0, 0.0));
        let b = cube(&mut tree, room, 2.0, Vec3::zeros());
        let far = cube(&mut tree, room, -6.0, Vec3::zeros());
        let ctx = context(EngineKind::Serial);

        // Gap of 1 closed by a movement of 2: contact at part 0.5
        assert_eq!(
            ctx.detect_collision(&tree, a, b).unwrap(),
            Detection::Committed { fraction: 0.4, displaced: vec![] }
        );
        assert_eq!(ctx.detect_collision(&tree, a, far).unwrap(), Detection::Clear);
        assert_eq!(tree.node(a).unwrap().resolution().obstacle, Some(b));
        assert_eq!(tree.node(b).unwrap().resolution().obstacle, Some(a));

        // The same hit again is not strictly nearer
        assert_eq!(ctx.detect_collision(&tree, b, a).unwrap(), Detection::Rejected(0.4));
    }

    #[test]
    fn test_unknown_mesh_is_reported() {
        let (mut tree, room) = room_tree();
        let a = cube(&mut tree, room, 0.0, Vec3::new(1.0, 0.0, 0.0));
        let b = cube(&mut tree, room, 3.0, Vec3::zeros());
        tree.remove(b).unwrap();
        assert!(matches!(
            context(EngineKind::Serial).detect_collision(&tree, a, b),
            Err(CollisionError::UnknownMesh(_))
        ));
    }

    #[test]
    fn test_container_pass_resolves_nearest() {
        for kind in [EngineKind::Serial, EngineKind::Parallel] {
            let (mut tree, room) = room_tree();
            let a = cube(&mut tree, room, 0.0, Vec3::new(3.0, 0.0, 0.0));
            // Already touching: stopped at 0
            let near = cube(&mut tree, room, 1.0, Vec3::zeros());
            // Reached at part 2/3
            let far = cube(&mut tree, room, 3.0, Vec3::zeros());
            tree.rebuild_grid(room).unwrap();

            let stats = context(kind).run_container_pass(&tree, room, &[a]).unwrap();
            assert_eq!(stats.moved, 1);
            assert!(stats.pairs_tested >= 2);
            assert!(stats.committed >= 1);

            let resolution = tree.node(a).unwrap().resolution();
            assert_eq!(resolution.obstacle, Some(near));
            assert_eq!(resolution.move_factor, 0.0);
            assert_eq!(tree.node(far).unwrap().resolution().obstacle, None);
        }
    }

    fn unit_cube_at(tree: &mut MeshTree, room: MeshId, center: Vec3, movement: Vec3) -> MeshId {
        let border = Border::new(center, Vec3::repeat(0.5)).with_movement(movement);
        tree.add_child(room, MeshNode::new(MeshKind::Object, border)).unwrap()
    }

    #[test]
    fn test_displaced_mover_is_requeued_and_repaired() {
        for kind in [EngineKind::Serial, EngineKind::Parallel] {
            let (mut tree, room) = room_tree();
            // A reaches C at 0.1 and meets the oncoming B at 0.3
            let a = unit_cube_at(&mut tree, room, Vec3::new(0.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
            let c = unit_cube_at(&mut tree, room, Vec3::new(1.15, 0.5, 1.4), Vec3::zeros());
            let b = unit_cube_at(&mut tree, room, Vec3::new(1.7, 0.5, -0.4), Vec3::new(-1.0, 0.0, 0.0));
            // D catches up with B from behind at 0.5, missing A and C on z
            let d = unit_cube_at(&mut tree, room, Vec3::new(3.25, 0.5, -1.3), Vec3::new(-2.0, 0.0, 0.0));
            tree.rebuild_grid(room).unwrap();

            // A and B start out paired at 0.3
            *lock(&tree.node(a).unwrap().resolution) = Resolution { obstacle: Some(b), move_factor: 0.3 };
            *lock(&tree.node(b).unwrap().resolution) = Resolution { obstacle: Some(a), move_factor: 0.3 };

            let stats = context(kind).run_container_pass(&tree, room, &[a, b, d]).unwrap();
            assert_eq!(stats.moved, 3);
            assert!(stats.requeued >= 1, "{kind}: {stats:?}");
            assert!(stats.extra_rounds >= 1, "{kind}: {stats:?}");

            let resolution = |id| tree.node(id).unwrap().resolution();
            assert_eq!(resolution(a), Resolution { obstacle: Some(c), move_factor: 0.1 });
            assert_eq!(resolution(c), Resolution { obstacle: Some(a), move_factor: 0.1 });
            assert_eq!(resolution(b), Resolution { obstacle: Some(d), move_factor: 0.5 });
            assert_eq!(resolution(d), Resolution { obstacle: Some(b), move_factor: 0.5 });
        }
    }

    #[test]
    fn test_frame_stats_accumulate() {
        let mut total = FrameStats::default();
        total += FrameStats { moved: 2, committed: 1, ..FrameStats::default() };
        total += FrameStats { moved: 3, bounced: 1, ..FrameStats::default() };
        assert_eq!(total.moved, 5);
        assert_eq!(total.committed, 1);
        assert_eq!(total.bounced, 1);
    }
}
