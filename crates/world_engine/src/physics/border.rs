//! Axis-aligned bounding proxy of a mesh
//!
//! A border is the unit of collision geometry. It keeps a mesh's location,
//! half extents and pending movement, and answers "would these two borders
//! overlap if both had already travelled `move_part` of their movement?".

use crate::foundation::math::{model_matrix, Point3, Vec3};
use crate::spatial::AABB;

/// Number of points in the local coordinate template
pub const TEMPLATE_POINTS: usize = 24;

/// Local coordinates of the unit cube: 6 faces × 4 corners
const LOCAL_TEMPLATE: [[f32; 3]; TEMPLATE_POINTS] = [
    // front (-z)
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
    // back (+z)
    [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
    // right (+x)
    [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0],
    // left (-x)
    [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0],
    // bottom (-y)
    [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0],
    // top (+y)
    [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
];

/// Template index of the minimum corner
const FIRST_CORNER: usize = 0;

/// Template index of the maximum corner
const LAST_CORNER: usize = 6;

/// Number of floats [`Border::packed`] produces
pub const PACKED_LEN: usize = 9;

/// Bounding-box proxy attached to a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    location: Vec3,
    scale: Vec3,
    /// Always `2 × scale`
    dimension: Vec3,
    movement: Vec3,
    /// Fraction of `movement` still safe to apply this frame
    move_factor: f32,
    /// World-space template, refreshed whenever location or scale change
    corners: [Point3; TEMPLATE_POINTS],
}

impl Border {
    /// Create a stationary border centred at `location` with half extents `scale`
    pub fn new(location: Vec3, scale: Vec3) -> Self {
        let mut border = Self {
            location,
            scale,
            dimension: scale * 2.0,
            movement: Vec3::zeros(),
            move_factor: 1.0,
            corners: [Point3::origin(); TEMPLATE_POINTS],
        };
        border.recompute_corners();
        border
    }

    /// Create a border that moves by `movement` every frame
    #[must_use]
    pub fn with_movement(mut self, movement: Vec3) -> Self {
        self.movement = movement;
        self
    }

    /// Centre of the border
    pub fn location(&self) -> Vec3 {
        self.location
    }

    /// Half extents
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Full extents (`2 × scale`)
    pub fn dimension(&self) -> Vec3 {
        self.dimension
    }

    /// Pending movement for this frame
    pub fn movement(&self) -> Vec3 {
        self.movement
    }

    /// Fraction of the movement still safe to apply
    pub fn move_factor(&self) -> f32 {
        self.move_factor
    }

    /// Whether the border has a non-zero pending movement
    pub fn is_moving(&self) -> bool {
        self.movement != Vec3::zeros()
    }

    /// Move the centre, refreshing the world corners
    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.recompute_corners();
    }

    /// Change the half extents, refreshing dimension and world corners
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.dimension = scale * 2.0;
        self.recompute_corners();
    }

    /// Replace the pending movement
    pub fn set_movement(&mut self, movement: Vec3) {
        self.movement = movement;
    }

    /// Reverse the pending movement
    pub fn invert_movement(&mut self) {
        self.movement = -self.movement;
    }

    /// Set the safe fraction, clamped to `[0, 1]`
    pub fn set_move_factor(&mut self, move_factor: f32) {
        self.move_factor = move_factor.clamp(0.0, 1.0);
    }

    /// Cached world-space template points
    pub fn coords_model_matrix_computed(&self) -> &[Point3; TEMPLATE_POINTS] {
        &self.corners
    }

    /// Minimum world corner
    pub fn first_point(&self) -> Vec3 {
        self.corners[FIRST_CORNER].coords
    }

    /// Maximum world corner
    pub fn last_point(&self) -> Vec3 {
        self.corners[LAST_CORNER].coords
    }

    /// Current world-space box
    pub fn aabb(&self) -> AABB {
        AABB::new(self.first_point(), self.last_point())
    }

    /// Box covering the border before and after its full pending movement
    pub fn swept_aabb(&self) -> AABB {
        let start = self.aabb();
        start.union(&start.translated(&self.movement))
    }

    /// Apply the pending movement scaled by the move factor
    ///
    /// A border stopped dead by a collision (`move_factor <= 0`) bounces:
    /// its movement is inverted for the next frame.
    pub fn compute_new_location(&mut self) {
        if !self.is_moving() {
            self.move_factor = 1.0;
            return;
        }

        self.location += self.movement * self.move_factor;
        if self.move_factor <= 0.0 {
            self.invert_movement();
        }
        self.move_factor = 1.0;
        self.recompute_corners();
    }

    /// First corner as if `move_part` of the movement had been applied
    pub fn retrieve_first_point_after_parted_move(&self, move_part: f32) -> Vec3 {
        self.first_point() + self.movement * move_part
    }

    /// Whether both borders overlap once each advanced by `move_part` of its own movement
    ///
    /// Each axis is tested on its own and the results are ANDed. Touching
    /// faces count as overlapping.
    pub fn is_obstacle_in_collision_after_parted_move(&self, other: &Border, move_part: f32) -> bool {
        let first = self.retrieve_first_point_after_parted_move(move_part);
        let other_first = other.retrieve_first_point_after_parted_move(move_part);

        let width = overlaps_on_axis(first.x, self.dimension.x, other_first.x, other.dimension.x);
        let height = overlaps_on_axis(first.y, self.dimension.y, other_first.y, other.dimension.y);
        let depth = overlaps_on_axis(first.z, self.dimension.z, other_first.z, other.dimension.z);

        width && height && depth
    }

    /// `(first_point, dimension, movement)` as nine floats
    pub fn packed(&self) -> [f32; PACKED_LEN] {
        let first = self.first_point();
        [
            first.x, first.y, first.z,
            self.dimension.x, self.dimension.y, self.dimension.z,
            self.movement.x, self.movement.y, self.movement.z,
        ]
    }

    fn recompute_corners(&mut self) {
        let model = model_matrix(&self.location, &self.scale);
        for (corner, local) in self.corners.iter_mut().zip(LOCAL_TEMPLATE.iter()) {
            *corner = model.transform_point(&Point3::new(local[0], local[1], local[2]));
        }
    }
}

/// Closed-interval overlap of `[a, a + a_extent]` and `[b, b + b_extent]`
fn overlaps_on_axis(a: f32, a_extent: f32, b: f32, b_extent: f32) -> bool {
    a <= b + b_extent && b <= a + a_extent
}
