//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the engine and the entity
//! transform. Rotations are Tait-Bryan angles applied in Y(1), X(2), Z(3)
//! order, matching the Vulkan-style Y-down world used by the camera.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Translation, rotation and scale of an entity or viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Position in world space
    pub translation: Vec3,

    /// Tait-Bryan angles in radians (x = pitch, y = yaw, z = roll)
    pub rotation: Vec3,

    /// Per-axis scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a transform positioned at `translation`
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Model matrix: `Translate * Ry * Rx * Rz * Scale`
    pub fn mat4(&self) -> Mat4 {
        let (c1, s1, c2, s2, c3, s3) = self.rotation_terms();
        let s = self.scale;
        let t = self.translation;

        Mat4::new(
            s.x * (c1 * c3 + s1 * s2 * s3), s.y * (c3 * s1 * s2 - c1 * s3), s.z * (c2 * s1), t.x,
            s.x * (c2 * s3),                s.y * (c2 * c3),                s.z * (-s2),     t.y,
            s.x * (c1 * s2 * s3 - c3 * s1), s.y * (c1 * c3 * s2 + s1 * s3), s.z * (c1 * c2), t.z,
            0.0,                            0.0,                            0.0,             1.0,
        )
    }

    /// Normal matrix: same rotation as [`Transform::mat4`] with inverse scale
    ///
    /// Equal to the inverse transpose of the model matrix's upper 3x3 block.
    /// A zero scale component yields infinities, as with any degenerate model.
    pub fn normal_matrix(&self) -> Mat3 {
        let (c1, s1, c2, s2, c3, s3) = self.rotation_terms();
        let inv = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);

        Mat3::new(
            inv.x * (c1 * c3 + s1 * s2 * s3), inv.y * (c3 * s1 * s2 - c1 * s3), inv.z * (c2 * s1),
            inv.x * (c2 * s3),                inv.y * (c2 * c3),                inv.z * (-s2),
            inv.x * (c1 * s2 * s3 - c3 * s1), inv.y * (c1 * c3 * s2 + s1 * s3), inv.z * (c1 * c2),
        )
    }

    fn rotation_terms(&self) -> (f32, f32, f32, f32, f32, f32) {
        let (s1, c1) = self.rotation.y.sin_cos();
        let (s2, c2) = self.rotation.x.sin_cos();
        let (s3, c3) = self.rotation.z.sin_cos();
        (c1, s1, c2, s2, c3, s3)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = std::f32::consts::TAU;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Pad a 3x3 matrix into the upper-left block of a 4x4 identity
    ///
    /// Push constant blocks carry normal matrices as mat4 to avoid std140
    /// column padding.
    pub fn mat3_to_mat4(m: &super::Mat3) -> Mat4 {
        m.to_homogeneous()
    }

    /// Convert to the column-major array layout consumed by shaders
    pub fn to_cols_array(m: &Mat4) -> [[f32; 4]; 4] {
        (*m).into()
    }

    /// Clamp every component of `v` into `[lower, upper]`
    pub fn clamp_components(v: &Vec3, lower: f32, upper: f32) -> Vec3 {
        v.map(|c| c.clamp(lower, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn reference_model(t: &Transform) -> Mat4 {
        let ry = Rotation3::from_axis_angle(&Vec3::y_axis(), t.rotation.y).to_homogeneous();
        let rx = Rotation3::from_axis_angle(&Vec3::x_axis(), t.rotation.x).to_homogeneous();
        let rz = Rotation3::from_axis_angle(&Vec3::z_axis(), t.rotation.z).to_homogeneous();
        Mat4::new_translation(&t.translation) * ry * rx * rz * Mat4::new_nonuniform_scaling(&t.scale)
    }

    #[test]
    fn test_identity_transform() {
        let transform = Transform::default();
        assert_relative_eq!(transform.mat4(), Mat4::identity(), epsilon = 1e-6);
        assert_relative_eq!(transform.normal_matrix(), Mat3::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_mat4_matches_yxz_composition() {
        let transform = Transform {
            translation: Vec3::new(1.0, -2.0, 3.5),
            rotation: Vec3::new(0.3, -1.1, 2.4),
            scale: Vec3::new(2.0, 0.5, 3.0),
        };
        assert_relative_eq!(transform.mat4(), reference_model(&transform), epsilon = 1e-5);
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let transform = Transform {
            translation: Vec3::new(4.0, 0.0, -1.0),
            rotation: Vec3::new(-0.7, 0.2, 0.9),
            scale: Vec3::new(3.0, 2.5, 0.25),
        };
        let upper = transform.mat4().fixed_view::<3, 3>(0, 0).into_owned();
        let expected = upper
            .try_inverse()
            .expect("non-degenerate scale must be invertible")
            .transpose();
        assert_relative_eq!(transform.normal_matrix(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_translation_lands_in_last_column() {
        let transform = Transform::from_translation(Vec3::new(7.0, 8.0, 9.0));
        let m = transform.mat4();
        assert_relative_eq!(m[(0, 3)], 7.0);
        assert_relative_eq!(m[(1, 3)], 8.0);
        assert_relative_eq!(m[(2, 3)], 9.0);
    }

    #[test]
    fn test_clamp_components() {
        let v = utils::clamp_components(&Vec3::new(-3.0, 0.5, 1.5), -1.0, 1.0);
        assert_relative_eq!(v, Vec3::new(-1.0, 0.5, 1.0));
    }
}
