//! Math utilities and types
//!
//! Column-major `nalgebra` aliases shared by the camera, the uniform protocol
//! and the scene transforms. Matrices are laid out exactly as OpenGL expects
//! them, so they upload without a transpose.

pub use nalgebra::{Matrix2, Matrix3, Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 2x2 matrix type
pub type Mat2 = Matrix2<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Convert degrees to radians
pub fn radians(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// Extension trait for Mat4 with the fixed-function style helpers used by scenes
///
/// Each helper post-multiplies, so `Mat4::identity().translated(..).rotated(..)`
/// applies the rotation first and the translation last, the same order as
/// chaining `translate`/`rotate`/`scale` on a model matrix.
pub trait Mat4Ext {
    /// Append a translation
    fn translated(&self, offset: &Vec3) -> Mat4;

    /// Append a rotation of `angle` radians around `axis` (normalised internally)
    fn rotated(&self, angle: f32, axis: &Vec3) -> Mat4;

    /// Append a uniform scale
    fn scaled(&self, factor: f32) -> Mat4;

    /// OpenGL-convention perspective projection (clip depth -1..1)
    fn perspective_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn translated(&self, offset: &Vec3) -> Mat4 {
        self * Mat4::new_translation(offset)
    }

    fn rotated(&self, angle: f32, axis: &Vec3) -> Mat4 {
        match Unit::try_new(*axis, f32::EPSILON) {
            Some(axis) => self * Mat4::from_axis_angle(&axis, angle),
            None => *self,
        }
    }

    fn scaled(&self, factor: f32) -> Mat4 {
        self * Mat4::new_scaling(factor)
    }

    fn perspective_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_translate_then_scale_order() {
        let model = Mat4::identity()
            .translated(&Vec3::new(1.0, 2.0, 3.0))
            .scaled(0.5);
        let p = model.transform_point(&Point3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(p, Point3::new(2.0, 3.0, 4.0), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_with_zero_axis_is_identity() {
        let m = Mat4::identity().rotated(1.0, &Vec3::zeros());
        assert_eq!(m, Mat4::identity());
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let view = Mat4::look_at(
            &Vec3::new(0.0, 0.0, 3.0),
            &Vec3::new(0.0, 0.0, 2.0),
            &Vec3::y(),
        );
        let eye = view.transform_point(&Point3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(eye, Point3::origin(), epsilon = 1e-6);
    }
}
