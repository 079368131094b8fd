//! Axis-aligned bounding boxes

use crate::foundation::math::{component_max, component_min, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing both boxes
    #[must_use]
    pub fn union(&self, other: &AABB) -> AABB {
        AABB::new(component_min(&self.min, &other.min), component_max(&self.max, &other.max))
    }

    /// Box moved by `offset`
    #[must_use]
    pub fn translated(&self, offset: &Vec3) -> AABB {
        AABB::new(self.min + offset, self.max + offset)
    }

    /// Check if this AABB contains a point (max faces excluded)
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x < self.max.x &&
        point.y >= self.min.y && point.y < self.max.y &&
        point.z >= self.min.z && point.z < self.max.z
    }

    /// Check if this AABB intersects another AABB (touching faces count)
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}
