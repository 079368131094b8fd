//! Nearest-obstacle arbitration
//!
//! Each mesh keeps at most one obstacle per frame together with the fraction
//! of movement it may still apply. Both live in one [`Resolution`] behind the
//! mesh's own mutex so they always change together.
//!
//! Commits go through the [`Arbiter`], which serializes them on a single pair
//! mutex. A pairing only replaces what either side already holds when it is
//! strictly nearer, so the outcome does not depend on the order in which
//! concurrently discovered pairs arrive.

use std::sync::Mutex;

use crate::foundation::collections::MeshId;
use crate::foundation::sync::lock;
use crate::physics::CollisionError;

/// Obstacle assignment of one mesh for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Nearest collision partner found so far
    pub obstacle: Option<MeshId>,
    /// Fraction of movement that is safe to apply
    pub move_factor: f32,
}

impl Resolution {
    /// Forget the obstacle and allow the full movement again
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            obstacle: None,
            move_factor: 1.0,
        }
    }
}

/// Frame countdown during which the last obstacle is ignored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    last_collision: Option<MeshId>,
    frames_left: u32,
}

impl Cooldown {
    /// Obstacle currently ignored, if any
    pub fn last_collision(&self) -> Option<MeshId> {
        self.last_collision
    }

    /// Frames before the obstacle is tested again
    pub fn frames_left(&self) -> u32 {
        self.frames_left
    }

    /// Whether a collision test against `obstacle` must be skipped
    pub fn is_blocking(&self, obstacle: MeshId) -> bool {
        self.last_collision == Some(obstacle)
    }

    /// Advance one frame
    pub fn tick(&mut self) {
        if self.last_collision.is_none() {
            return;
        }
        self.frames_left = self.frames_left.saturating_sub(1);
        if self.frames_left == 0 {
            self.last_collision = None;
        }
    }

    /// Start ignoring `obstacle` for `frames` frames
    pub fn record(&mut self, obstacle: MeshId, frames: u32) {
        if frames == 0 {
            self.last_collision = None;
            self.frames_left = 0;
        } else {
            self.last_collision = Some(obstacle);
            self.frames_left = frames;
        }
    }
}

/// Access to the per-mesh resolution slots arbitrated over
pub trait ObstacleSlots {
    /// Resolution slot of `mesh`, `None` if the mesh no longer exists
    fn resolution_slot(&self, mesh: MeshId) -> Option<&Mutex<Resolution>>;

    /// Whether `mesh` has a pending movement
    fn is_moving(&self, mesh: MeshId) -> bool;
}

/// Outcome of a commit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    /// Either side already holds an obstacle at least as near
    Rejected,
    /// Both sides now point at each other
    Committed {
        /// Moving meshes whose pairing was broken and need another pass
        displaced: Vec<MeshId>,
    },
}

/// Serializes obstacle commits
#[derive(Debug, Default)]
pub struct Arbiter {
    pair: Mutex<()>,
}

impl Arbiter {
    /// Create an arbiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `a` and `b` at `fraction` if it is nearer than what either holds
    ///
    /// Previous partners of `a` or `b` that still point back at them are
    /// cleared. The moving ones are returned for re-queueing.
    pub fn commit<S: ObstacleSlots + ?Sized>(
        &self,
        slots: &S,
        a: MeshId,
        b: MeshId,
        fraction: f32,
    ) -> Result<Commit, CollisionError> {
        if a == b {
            return Ok(Commit::Rejected);
        }

        let slot_a = slots.resolution_slot(a).ok_or(CollisionError::UnknownMesh(a))?;
        let slot_b = slots.resolution_slot(b).ok_or(CollisionError::UnknownMesh(b))?;

        let _pair = lock(&self.pair);

        let previous = {
            let mut res_a = lock(slot_a);
            let mut res_b = lock(slot_b);

            if !(fraction < res_a.move_factor && fraction < res_b.move_factor) {
                return Ok(Commit::Rejected);
            }

            let previous = [res_a.obstacle, res_b.obstacle];
            *res_a = Resolution { obstacle: Some(b), move_factor: fraction };
            *res_b = Resolution { obstacle: Some(a), move_factor: fraction };
            previous
        };

        let mut displaced = Vec::new();
        for partner in previous.into_iter().flatten() {
            if partner == a || partner == b || displaced.contains(&partner) {
                continue;
            }
            let Some(slot) = slots.resolution_slot(partner) else {
                continue;
            };
            let mut res = lock(slot);
            if res.obstacle == Some(a) || res.obstacle == Some(b) {
                res.clear();
                drop(res);
                if slots.is_moving(partner) {
                    displaced.push(partner);
                }
            }
        }

        if !displaced.is_empty() {
            log::trace!("{:?}<->{:?} at {} displaced {:?}", a, b, fraction, displaced);
        }

        Ok(Commit::Committed { displaced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::MeshArena;

    struct Slots {
        meshes: MeshArena<(Mutex<Resolution>, bool)>,
    }

    impl Slots {
        fn new() -> Self {
            Self { meshes: MeshArena::with_key() }
        }

        fn add(&mut self, moving: bool) -> MeshId {
            self.meshes.insert((Mutex::new(Resolution::default()), moving))
        }

        fn get(&self, id: MeshId) -> Resolution {
            *lock(&self.meshes[id].0)
        }
    }

    impl ObstacleSlots for Slots {
        fn resolution_slot(&self, mesh: MeshId) -> Option<&Mutex<Resolution>> {
            self.meshes.get(mesh).map(|(slot, _)| slot)
        }

        fn is_moving(&self, mesh: MeshId) -> bool {
            self.meshes.get(mesh).is_some_and(|(_, moving)| *moving)
        }
    }

    #[test]
    fn test_commit_pairs_both_sides() {
        let mut slots = Slots::new();
        let (a, b) = (slots.add(true), slots.add(false));
        let arbiter = Arbiter::new();

        let commit = arbiter.commit(&slots, a, b, 0.4).unwrap();
        assert_eq!(commit, Commit::Committed { displaced: vec![] });
        assert_eq!(slots.get(a), Resolution { obstacle: Some(b), move_factor: 0.4 });
        assert_eq!(slots.get(b), Resolution { obstacle: Some(a), move_factor: 0.4 });
    }

    #[test]
    fn test_equal_fraction_does_not_replace() {
        let mut slots = Slots::new();
        let (a, b, c) = (slots.add(true), slots.add(true), slots.add(true));
        let arbiter = Arbiter::new();

        arbiter.commit(&slots, a, b, 0.5).unwrap();
        assert_eq!(arbiter.commit(&slots, a, c, 0.5).unwrap(), Commit::Rejected);
        assert_eq!(arbiter.commit(&slots, b, a, 0.5).unwrap(), Commit::Rejected);
        assert_eq!(slots.get(a).obstacle, Some(b));
        assert_eq!(slots.get(c), Resolution::default());
    }

    #[test]
    fn test_nearest_wins_in_either_order() {
        for nearer_first in [false, true] {
            let mut slots = Slots::new();
            let (a, b, c) = (slots.add(true), slots.add(true), slots.add(false));
            let arbiter = Arbiter::new();

            if nearer_first {
                arbiter.commit(&slots, a, c, 0.1).unwrap();
                assert_eq!(arbiter.commit(&slots, a, b, 0.3).unwrap(), Commit::Rejected);
            } else {
                arbiter.commit(&slots, a, b, 0.3).unwrap();
                assert_eq!(
                    arbiter.commit(&slots, a, c, 0.1).unwrap(),
                    Commit::Committed { displaced: vec![b] }
                );
            }

            assert_eq!(slots.get(a), Resolution { obstacle: Some(c), move_factor: 0.1 });
            assert_eq!(slots.get(c), Resolution { obstacle: Some(a), move_factor: 0.1 });
            assert_eq!(slots.get(b), Resolution::default());
        }
    }

    #[test]
    fn test_stationary_partner_is_cleared_not_requeued() {
        let mut slots = Slots::new();
        let (a, wall, c) = (slots.add(true), slots.add(false), slots.add(true));
        let arbiter = Arbiter::new();

        arbiter.commit(&slots, a, wall, 0.6).unwrap();
        let commit = arbiter.commit(&slots, a, c, 0.2).unwrap();
        assert_eq!(commit, Commit::Committed { displaced: vec![] });
        assert_eq!(slots.get(wall), Resolution::default());
    }

    #[test]
    fn test_partner_paired_elsewhere_is_kept() {
        let mut slots = Slots::new();
        let (a, b, c, d) = (slots.add(true), slots.add(true), slots.add(true), slots.add(true));
        let arbiter = Arbiter::new();

        arbiter.commit(&slots, a, b, 0.5).unwrap();
        // b moves on to a nearer partner; a is displaced
        assert_eq!(
            arbiter.commit(&slots, b, d, 0.2).unwrap(),
            Commit::Committed { displaced: vec![a] }
        );
        // a then pairs with c; b no longer points at a and stays with d
        arbiter.commit(&slots, a, c, 0.4).unwrap();
        assert_eq!(slots.get(b), Resolution { obstacle: Some(d), move_factor: 0.2 });
    }

    #[test]
    fn test_unknown_mesh() {
        let mut slots = Slots::new();
        let a = slots.add(true);
        let gone = slots.add(true);
        slots.meshes.remove(gone);
        assert!(matches!(
            Arbiter::new().commit(&slots, a, gone, 0.1),
            Err(CollisionError::UnknownMesh(id)) if id == gone
        ));
    }

    #[test]
    fn test_cooldown_countdown() {
        let mut slots = Slots::new();
        let obstacle = slots.add(false);
        let mut cooldown = Cooldown::default();

        cooldown.record(obstacle, 4);
        for _ in 0..3 {
            assert!(cooldown.is_blocking(obstacle));
            cooldown.tick();
        }
        assert!(cooldown.is_blocking(obstacle));
        assert_eq!(cooldown.frames_left(), 1);
        cooldown.tick();
        assert!(!cooldown.is_blocking(obstacle));
        assert_eq!(cooldown.last_collision(), None);
    }

    #[test]
    fn test_concurrent_commits_keep_the_minimum() {
        use rayon::prelude::*;

        let mut slots = Slots::new();
        let target = slots.add(true);
        let others: Vec<MeshId> = (0..32).map(|_| slots.add(false)).collect();
        let arbiter = Arbiter::new();

        others.par_iter().enumerate().for_each(|(i, &other)| {
            let fraction = 0.05 + (i as f32 * 7.0 % 32.0) / 40.0;
            arbiter.commit(&slots, target, other, fraction).unwrap();
        });

        // i = 0 carries the smallest fraction
        assert_eq!(slots.get(target).obstacle, Some(others[0]));
        assert_eq!(slots.get(target).move_factor, 0.05);
        for &other in &others[1..] {
            assert_eq!(slots.get(other), Resolution::default());
        }
    }
}
