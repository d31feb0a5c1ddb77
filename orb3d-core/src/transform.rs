/// Per-drawable transform matrices
use nalgebra::{Matrix3, Matrix4, Point3, Vector3, Vector4};

use crate::error::{Error, Result};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations.
///
/// Matrices act on column vectors, so `a * b` applies `b` first.
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        // Apply rotations in order: X, Y, Z
        Self::rotation_z(rotation.z) * Self::rotation_y(rotation.y) * Self::rotation_x(rotation.x)
    }

    pub fn rotation_x(angle: f32) -> Matrix4<f32> {
        Matrix4::from_axis_angle(&Vector3::x_axis(), angle)
    }

    pub fn rotation_y(angle: f32) -> Matrix4<f32> {
        Matrix4::from_axis_angle(&Vector3::y_axis(), angle)
    }

    pub fn rotation_z(angle: f32) -> Matrix4<f32> {
        Matrix4::from_axis_angle(&Vector3::z_axis(), angle)
    }

    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Scale first, then rotate, then translate
    pub fn model_matrix(
        translation: &Vector3<f32>,
        rotation: &RotationState,
        scale: &Vector3<f32>,
    ) -> Matrix4<f32> {
        Matrix4::new_translation(translation)
            * Self::rotation_matrix(rotation)
            * Matrix4::new_nonuniform_scaling(scale)
    }

    /// Inverse-transpose of the model's linear part, for transforming normals.
    ///
    /// Fails when the linear part is singular, e.g. a scale factor of exactly zero.
    pub fn normal_matrix(model: &Matrix4<f32>) -> Result<Matrix3<f32>> {
        let mut linear = *model;
        linear.set_column(3, &Vector4::new(0.0, 0.0, 0.0, 1.0));

        let inverse = linear
            .try_inverse()
            .filter(|m| m.iter().all(|v| v.is_finite()))
            .ok_or(Error::DegenerateTransform)?;

        Ok(inverse.transpose().fixed_view::<3, 3>(0, 0).into_owned())
    }

    /// Right-handed look-at view matrix
    pub fn view_matrix(eye: &Point3<f32>, target: &Point3<f32>, up: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::look_at_rh(eye, target, up)
    }

    /// Perspective projection with a vertical field of view in radians
    pub fn projection_matrix(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect, fov_y, near, far)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }
}
