//! Math utilities and types
//!
//! Provides the fundamental math types used by the grid and collision code.

pub use nalgebra::{Vector3, Matrix4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3D integer vector type (grid coordinates and box counts)
pub type IVec3 = Vector3<i32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Build the model matrix of an axis-aligned object: translate then scale
pub fn model_matrix(location: &Vec3, scale: &Vec3) -> Mat4 {
    Mat4::new_translation(location) * Mat4::new_nonuniform_scaling(scale)
}

/// Component-wise minimum of two vectors
pub fn component_min(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f32::min)
}

/// Component-wise maximum of two vectors
pub fn component_max(a: &Vec3, b: &Vec3) -> Vec3 {
    a.zip_map(b, f32::max)
}

/// Sign of each component: -1, 0 or 1 (zero stays zero)
pub fn component_signum(v: &Vec3) -> IVec3 {
    v.map(|c| {
        if c > 0.0 {
            1
        } else if c < 0.0 {
            -1
        } else {
            0
        }
    })
}

/// Largest power of two less than or equal to `value` (`value` must be non-zero)
pub fn previous_power_of_two(value: u32) -> u32 {
    debug_assert!(value > 0);
    1 << (31 - value.leading_zeros())
}
