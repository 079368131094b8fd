//! Discretized swept collision search
//!
//! Every backend answers the same question: split the pending movement of two
//! borders into `granularity` steps and find the largest fraction that is
//! still clear of the obstacle. For `step` in `1..=g`, a step whose
//! `move_part = step / g` overlaps yields the candidate `(step - 1) / g`; the
//! answer is the smallest candidate, or `1.0` when no step overlaps.
//!
//! Backends only differ in how they search for the first overlapping step.
//! All of them convert that step index with [`fraction_for_step`], which keeps
//! their results bit-identical.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, DEFAULT_GRANULARITY};
use crate::physics::{Border, CollisionError};

#[cfg(feature = "accelerator")]
use crate::physics::accelerator::AcceleratorEngine;

/// Engine selection key, chosen once at startup from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Plain loop with early exit
    #[default]
    Serial,
    /// Every step evaluated on the rayon pool, reduced with a minimum
    Parallel,
    /// Every step evaluated by a compute kernel
    Accelerator,
}

impl EngineKind {
    /// Configuration key of this engine
    pub fn name(&self) -> &'static str {
        match self {
            EngineKind::Serial => "serial",
            EngineKind::Parallel => "parallel",
            EngineKind::Accelerator => "accelerator",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(EngineKind::Serial),
            "parallel" => Ok(EngineKind::Parallel),
            "accelerator" => Ok(EngineKind::Accelerator),
            other => Err(ConfigError::Invalid(format!("unknown collision engine '{other}'"))),
        }
    }
}

/// Fraction reported for the first overlapping step (1-based), if any
pub fn fraction_for_step(first_hit: Option<u32>, granularity: u32) -> f32 {
    match first_hit {
        Some(step) => (step - 1) as f32 / granularity as f32,
        None => 1.0,
    }
}

/// `move_part` evaluated at `step`
fn move_part(step: u32, granularity: u32) -> f32 {
    step as f32 / granularity as f32
}

/// Collision backend
///
/// Built once from an [`EngineKind`] and shared by reference for the
/// lifetime of the world.
pub enum CollisionEngine {
    /// Early-exit loop over the steps
    Serial {
        /// Number of steps
        granularity: u32,
    },
    /// Parallel search reduced with a minimum
    ParallelReduce {
        /// Number of steps
        granularity: u32,
    },
    /// Compute-kernel search
    #[cfg(feature = "accelerator")]
    Accelerator(AcceleratorEngine),
}

impl CollisionEngine {
    /// Build the engine selected by `kind`
    ///
    /// The accelerator clamps `granularity` to what its device supports; read
    /// the effective value back with [`CollisionEngine::granularity`].
    pub fn new(kind: EngineKind, granularity: u32) -> Result<Self, CollisionError> {
        if granularity == 0 {
            return Err(CollisionError::InvalidGranularity(granularity));
        }

        let engine = match kind {
            EngineKind::Serial => CollisionEngine::Serial { granularity },
            EngineKind::Parallel => CollisionEngine::ParallelReduce { granularity },
            #[cfg(feature = "accelerator")]
            EngineKind::Accelerator => CollisionEngine::Accelerator(AcceleratorEngine::new(granularity)?),
            #[cfg(not(feature = "accelerator"))]
            EngineKind::Accelerator => return Err(CollisionError::AcceleratorUnavailable),
        };

        log::info!("Collision engine: {} (granularity {})", kind, engine.granularity());
        Ok(engine)
    }

    /// Serial engine with the default granularity
    pub fn serial() -> Self {
        CollisionEngine::Serial { granularity: DEFAULT_GRANULARITY }
    }

    /// Which kind of engine this is
    pub fn kind(&self) -> EngineKind {
        match self {
            CollisionEngine::Serial { .. } => EngineKind::Serial,
            CollisionEngine::ParallelReduce { .. } => EngineKind::Parallel,
            #[cfg(feature = "accelerator")]
            CollisionEngine::Accelerator(_) => EngineKind::Accelerator,
        }
    }

    /// Effective number of steps
    pub fn granularity(&self) -> u32 {
        match self {
            CollisionEngine::Serial { granularity } | CollisionEngine::ParallelReduce { granularity } => *granularity,
            #[cfg(feature = "accelerator")]
            CollisionEngine::Accelerator(engine) => engine.granularity(),
        }
    }

    /// Largest safe fraction of movement before `target` and `obstacle` overlap
    pub fn compute_collision(&self, target: &Border, obstacle: &Border) -> Result<f32, CollisionError> {
        let granularity = self.granularity();
        let first_hit = match self {
            CollisionEngine::Serial { .. } => first_hit_serial(target, obstacle, granularity),
            CollisionEngine::ParallelReduce { .. } => first_hit_parallel(target, obstacle, granularity),
            #[cfg(feature = "accelerator")]
            CollisionEngine::Accelerator(engine) => engine.first_hit(target, obstacle)?,
        };
        Ok(fraction_for_step(first_hit, granularity))
    }
}

impl fmt::Debug for CollisionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionEngine")
            .field("kind", &self.kind())
            .field("granularity", &self.granularity())
            .finish()
    }
}

fn first_hit_serial(target: &Border, obstacle: &Border, granularity: u32) -> Option<u32> {
    // Scanning upwards, the first hit carries the smallest candidate
    (1..=granularity)
        .find(|&step| target.is_obstacle_in_collision_after_parted_move(obstacle, move_part(step, granularity)))
}

fn first_hit_parallel(target: &Border, obstacle: &Border, granularity: u32) -> Option<u32> {
    (1..=granularity)
        .into_par_iter()
        .filter(|&step| target.is_obstacle_in_collision_after_parted_move(obstacle, move_part(step, granularity)))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_engine_kind_keys() {
        assert_eq!("serial".parse::<EngineKind>().unwrap(), EngineKind::Serial);
        assert_eq!(" Parallel ".parse::<EngineKind>().unwrap(), EngineKind::Parallel);
        assert_eq!("accelerator".parse::<EngineKind>().unwrap(), EngineKind::Accelerator);
        assert!("gpu".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::Parallel.to_string(), "parallel");
    }

    #[test]
    fn test_zero_granularity_rejected() {
        assert!(matches!(
            CollisionEngine::new(EngineKind::Serial, 0),
            Err(CollisionError::InvalidGranularity(0))
        ));
    }

    #[cfg(not(feature = "accelerator"))]
    #[test]
    fn test_accelerator_unavailable_without_feature() {
        assert!(matches!(
            CollisionEngine::new(EngineKind::Accelerator, 16),
            Err(CollisionError::AcceleratorUnavailable)
        ));
    }

    #[test]
    fn test_fraction_for_step() {
        assert_eq!(fraction_for_step(None, 10), 1.0);
        assert_eq!(fraction_for_step(Some(1), 10), 0.0);
        assert_eq!(fraction_for_step(Some(10), 10), 0.9);
    }

    #[test]
    fn test_engine_reports_kind_and_granularity() {
        let engine = CollisionEngine::new(EngineKind::Parallel, 32).unwrap();
        assert_eq!(engine.kind(), EngineKind::Parallel);
        assert_eq!(engine.granularity(), 32);
        assert_eq!(CollisionEngine::serial().granularity(), DEFAULT_GRANULARITY);
    }

    #[test]
    fn test_serial_stops_at_first_hit() {
        let a = Border::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).with_movement(Vec3::new(4.0, 0.0, 0.0));
        let b = Border::new(Vec3::new(4.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        // Contact at part 0.5, which is step 4 of 8
        assert_eq!(first_hit_serial(&a, &b, 8), Some(4));
        assert_eq!(first_hit_parallel(&a, &b, 8), Some(4));
    }
}
