/// Camera models and projection settings
use nalgebra::{Matrix4, Point3, Vector2, Vector3};

use crate::transform::Transform;

/// Minimum follow-camera height
pub const MIN_HEIGHT: f64 = 0.1;
/// Minimum follow-camera view distance
pub const MIN_VIEW_DISTANCE: f64 = 1.0;
/// Factor applied by `increase_height` / `decrease_height`
pub const HEIGHT_SCALE_FACTOR: f64 = 1.1;
/// Angle added or removed by a single rotate call: 5 degrees
pub const ANGLE_STEP: f64 = std::f64::consts::PI / 180.0 * 5.0;

/// Anything that can be looked through. State is kept in `f64` and rounded to `f32` here.
pub trait ViewCamera {
    fn eye(&self) -> Point3<f32>;

    fn target(&self) -> Point3<f32>;

    /// World up by default
    fn up(&self) -> Vector3<f32> {
        Vector3::y()
    }

    fn view_matrix(&self) -> Matrix4<f32> {
        Transform::view_matrix(&self.eye(), &self.target(), &self.up())
    }
}

fn to_f32(p: &Point3<f64>) -> Point3<f32> {
    p.cast::<f32>()
}

/// Free camera with a fixed look direction.
///
/// Movement is along world axes and never turns the camera; the look direction only changes
/// when set explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct PanCamera {
    position: Point3<f64>,
    look_direction: Vector3<f64>,
}

impl PanCamera {
    pub fn new(position: Point3<f64>, look_direction: Vector3<f64>) -> Self {
        Self {
            position,
            look_direction,
        }
    }

    pub fn position(&self) -> Point3<f64> {
        self.position
    }

    pub fn set_position(&mut self, position: Point3<f64>) {
        self.position = position;
    }

    pub fn look_direction(&self) -> Vector3<f64> {
        self.look_direction
    }

    pub fn set_look_direction(&mut self, direction: Vector3<f64>) {
        self.look_direction = direction;
    }

    /// Translate by a world-space offset
    pub fn pan(&mut self, offset: Vector3<f64>) {
        self.position += offset;
    }

    pub fn move_forward(&mut self, distance: f64) {
        self.pan(Vector3::new(0.0, 0.0, -distance));
    }

    pub fn move_backward(&mut self, distance: f64) {
        self.pan(Vector3::new(0.0, 0.0, distance));
    }

    pub fn strafe_left(&mut self, distance: f64) {
        self.pan(Vector3::new(-distance, 0.0, 0.0));
    }

    pub fn strafe_right(&mut self, distance: f64) {
        self.pan(Vector3::new(distance, 0.0, 0.0));
    }

    pub fn raise(&mut self, distance: f64) {
        self.pan(Vector3::new(0.0, distance, 0.0));
    }

    pub fn lower(&mut self, distance: f64) {
        self.pan(Vector3::new(0.0, -distance, 0.0));
    }
}

impl Default for PanCamera {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 15.0, 40.0), Vector3::new(0.0, -0.3, -1.0))
    }
}

impl ViewCamera for PanCamera {
    fn eye(&self) -> Point3<f32> {
        to_f32(&self.position)
    }

    fn target(&self) -> Point3<f32> {
        to_f32(&(self.position + self.look_direction))
    }
}

/// Third-person camera that stands on a ground position and looks horizontally.
///
/// The ground position is normally copied from a tracked object every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowCamera {
    /// X and Z are the ground position, Y is the height
    position: Point3<f64>,
    view_distance: f64,
    view_angle: f64,
}

impl FollowCamera {
    pub fn new() -> Self {
        Self {
            position: Point3::new(0.0, 15.0, 0.0),
            view_distance: 10.0,
            view_angle: std::f64::consts::PI,
        }
    }

    /// Position on the X/Z plane, returned as `(x, z)`
    pub fn ground_position(&self) -> Vector2<f64> {
        Vector2::new(self.position.x, self.position.z)
    }

    pub fn set_ground_position(&mut self, ground: Vector2<f64>) {
        self.position.x = ground.x;
        self.position.z = ground.y;
    }

    pub fn height(&self) -> f64 {
        self.position.y
    }

    /// Clamped to at least [`MIN_HEIGHT`]
    pub fn set_height(&mut self, height: f64) {
        self.position.y = height.max(MIN_HEIGHT);
    }

    pub fn view_distance(&self) -> f64 {
        self.view_distance
    }

    /// Clamped to at least [`MIN_VIEW_DISTANCE`]
    pub fn set_view_distance(&mut self, distance: f64) {
        self.view_distance = distance.max(MIN_VIEW_DISTANCE);
    }

    /// Radians around the Y axis; not wrapped
    pub fn view_angle(&self) -> f64 {
        self.view_angle
    }

    pub fn set_view_angle(&mut self, angle: f64) {
        self.view_angle = angle;
    }

    /// Unit look direction on the ground plane: `(sin a, 0, cos a)`
    pub fn forward(&self) -> Vector3<f64> {
        Vector3::new(self.view_angle.sin(), 0.0, self.view_angle.cos())
    }

    /// Unit strafe-right direction: `(cos a, 0, -sin a)`
    pub fn right(&self) -> Vector3<f64> {
        Vector3::new(self.view_angle.cos(), 0.0, -self.view_angle.sin())
    }

    pub fn move_forward(&mut self, distance: f64) {
        self.position += self.forward() * distance;
    }

    pub fn move_backward(&mut self, distance: f64) {
        self.position -= self.forward() * distance;
    }

    pub fn strafe_left(&mut self, distance: f64) {
        self.position -= self.right() * distance;
    }

    pub fn strafe_right(&mut self, distance: f64) {
        self.position += self.right() * distance;
    }

    /// Turn counter-clockwise seen from above
    pub fn rotate_left(&mut self) {
        self.view_angle -= ANGLE_STEP;
    }

    /// Turn clockwise seen from above, towards [`FollowCamera::right`]
    pub fn rotate_right(&mut self) {
        self.view_angle += ANGLE_STEP;
    }

    pub fn increase_height(&mut self) {
        self.set_height(self.height() * HEIGHT_SCALE_FACTOR);
    }

    pub fn decrease_height(&mut self) {
        self.set_height(self.height() / HEIGHT_SCALE_FACTOR);
    }
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCamera for FollowCamera {
    fn eye(&self) -> Point3<f32> {
        to_f32(&self.position)
    }

    /// Level with the eye, `view_distance` ahead
    fn target(&self) -> Point3<f32> {
        to_f32(&(self.position + self.forward() * self.view_distance))
    }
}

/// Perspective projection settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

/// Zero-sized viewports (minimized windows) are treated as one pixel wide or tall
fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

impl Projection {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            fov_y: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Keep the aspect ratio in sync with the viewport
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Transform::projection_matrix(self.fov_y, self.aspect, self.near, self.far)
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}
