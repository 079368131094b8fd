//! Configuration system
//!
//! Configuration is plain serde data loaded once at process start. The
//! collision engine is chosen here and never swapped while the world runs.

pub use serde::{Serialize, Deserialize};

use crate::physics::EngineKind;
use crate::spatial::MAX_BOXES_PER_AXIS;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its allowed range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Default number of discretization steps for the swept search
pub const DEFAULT_GRANULARITY: u32 = 16;

/// Default number of frames an obstacle stays ignored after a collision
pub const DEFAULT_COOLDOWN_FRAMES: u32 = 4;

/// # Collision Configuration
///
/// Selects the collision backend and tunes the discretized search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Which backend computes collision fractions
    pub engine: EngineKind,
    /// Number of steps the pending movement is split into
    pub granularity: u32,
    /// Frames during which a just-hit obstacle is skipped
    pub cooldown_frames: u32,
    /// Upper bound on re-queue rounds for displaced meshes within one frame
    pub max_requeue_rounds: u32,
}

impl CollisionConfig {
    /// Create a collision configuration for the given backend
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }

    /// Set the granularity
    #[must_use]
    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.granularity == 0 {
            return Err(ConfigError::Invalid("granularity must be at least 1".to_string()));
        }

        if self.max_requeue_rounds == 0 {
            return Err(ConfigError::Invalid("max_requeue_rounds must be at least 1".to_string()));
        }

        Ok(())
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Serial,
            granularity: DEFAULT_GRANULARITY,
            cooldown_frames: DEFAULT_COOLDOWN_FRAMES,
            max_requeue_rounds: 8,
        }
    }
}

/// # Grid Configuration
///
/// How finely container volumes are split into boxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Boxes per axis in every room grid
    pub room_boxes: [i32; 3],
    /// Boxes per axis in the universe grid (one box per room slot)
    pub universe_boxes: [i32; 3],
}

impl GridConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room_boxes.iter().chain(self.universe_boxes.iter()).any(|&n| n <= 0) {
            return Err(ConfigError::Invalid("box counts must be positive".to_string()));
        }
        if self.room_boxes.iter().chain(self.universe_boxes.iter()).any(|&n| n > MAX_BOXES_PER_AXIS) {
            return Err(ConfigError::Invalid(format!("box counts must not exceed {MAX_BOXES_PER_AXIS}")));
        }
        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            room_boxes: [8, 4, 8],
            universe_boxes: [3, 2, 3],
        }
    }
}

/// # Universe Configuration
///
/// Sizes handed to the content generators that populate the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Half extents of one room
    pub room_scale: [f32; 3],
    /// Number of moving objects placed in each room
    pub objects_per_room: usize,
    /// Half extents of a moving object
    pub object_scale: f32,
    /// Largest per-axis movement per frame
    pub max_speed: f32,
    /// Frames the demo runs
    pub frames: u64,
    /// Seed for room and object placement
    pub seed: u64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            room_scale: [16.0, 8.0, 16.0],
            objects_per_room: 12,
            object_scale: 0.5,
            max_speed: 0.4,
            frames: 600,
            seed: 42,
        }
    }
}

/// # Complete World Configuration
///
/// Top-level configuration read by applications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Collision backend configuration
    pub collision: CollisionConfig,
    /// Spatial grid configuration
    pub grid: GridConfig,
    /// Content sizes
    pub universe: UniverseConfig,
}

impl WorldConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.collision.validate()?;
        self.grid.validate()?;
        Ok(())
    }
}

impl Config for WorldConfig {}
