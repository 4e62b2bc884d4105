//! # Fly Camera
//!
//! Euler-angle camera driven by keyboard movement, mouse look and scroll
//! zoom. The frame driver only needs the [`CameraView`] capability; the
//! concrete camera is free to be swapped out.
//!
//! ## Conventions
//! - Right-handed, Y-up world space
//! - Yaw −90° looks down −Z
//! - Angles are stored in degrees and converted when the basis is rebuilt

use serde::{Deserialize, Serialize};

use crate::foundation::math::{radians, Mat4, Mat4Ext, Vec3};

/// Default yaw in degrees (looking down −Z)
pub const YAW: f32 = -90.0;
/// Default pitch in degrees
pub const PITCH: f32 = 0.0;
/// Default movement speed in units per second
pub const SPEED: f32 = 2.5;
/// Default mouse sensitivity in degrees per pixel
pub const SENSITIVITY: f32 = 0.1;
/// Default (and maximum) vertical field of view in degrees
pub const ZOOM: f32 = 45.0;

const MIN_ZOOM: f32 = 1.0;
const PITCH_LIMIT: f32 = 89.0;

/// What the frame driver reads from a camera each frame
pub trait CameraView {
    /// World-to-view matrix
    fn view_matrix(&self) -> Mat4;

    /// Eye position in world space
    fn position(&self) -> Vec3;

    /// Unit view direction
    fn front(&self) -> Vec3;

    /// Vertical field of view in degrees
    fn zoom(&self) -> f32;
}

/// Keyboard movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMovement {
    /// Along the view direction
    Forward,
    /// Against the view direction
    Backward,
    /// Along −right
    Left,
    /// Along +right
    Right,
}

/// Yaw/pitch camera with free movement
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    zoom: f32,
}

impl FlyCamera {
    /// Create a camera at `position` oriented by `yaw` and `pitch` (degrees)
    ///
    /// # Arguments
    /// * `position` - Eye position in world space
    /// * `world_up` - World up direction, normally +Y
    /// * `yaw` - Heading in degrees, −90 looks down −Z
    /// * `pitch` - Elevation in degrees, clamped to ±89
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: -Vec3::z(),
            up: world_up,
            right: Vec3::x(),
            world_up,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
        };
        camera.update_vectors();
        camera
    }

    /// Camera at `position` with the default orientation
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::y(), YAW, PITCH)
    }

    /// Set the movement speed in units per second
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    /// Set the mouse sensitivity in degrees per pixel
    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.mouse_sensitivity = sensitivity;
        self
    }

    /// Set the field of view in degrees, clamped to [1, 45]
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom.clamp(MIN_ZOOM, ZOOM);
        self
    }

    /// Move along the camera basis, scaled by frame time
    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Turn by a cursor offset in pixels (positive y looks up)
    ///
    /// With `constrain_pitch` the pitch stays within ±89° so the view never
    /// flips over the pole.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Zoom by a scroll offset; the field of view stays within [1, 45]
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (radians(self.yaw), radians(self.pitch));
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(&self.world_up).normalize();
        self.up = self.right.cross(&self.front).normalize();
    }

    /// Heading in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Elevation in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Camera up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Camera right vector
    pub fn right(&self) -> Vec3 {
        self.right
    }
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self::at(Vec3::zeros())
    }
}

impl CameraView for FlyCamera {
    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(&self.position, &(self.position + self.front), &self.up)
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn front(&self) -> Vec3 {
        self.front
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = FlyCamera::at(Vec3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(camera.front(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(camera.right(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(camera.up(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn test_keyboard_moves_by_speed_times_delta() {
        let mut camera = FlyCamera::at(Vec3::zeros());
        camera.process_keyboard(CameraMovement::Forward, 0.4);
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
        camera.process_keyboard(CameraMovement::Right, 0.2);
        assert_relative_eq!(camera.position(), Vec3::new(0.5, 0.0, -1.0), epsilon = 1e-6);
        camera.process_keyboard(CameraMovement::Left, 0.2);
        camera.process_keyboard(CameraMovement::Backward, 0.4);
        assert_relative_eq!(camera.position(), Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_pitch_is_constrained() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_relative_eq!(camera.pitch(), 89.0);
        camera.process_mouse_movement(0.0, -20_000.0, true);
        assert_relative_eq!(camera.pitch(), -89.0);
        camera.process_mouse_movement(0.0, -100.0, false);
        assert_relative_eq!(camera.pitch(), -99.0, epsilon = 1e-4);
    }

    #[test]
    fn test_mouse_yaw_turns_right() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_movement(900.0, 0.0, true);
        assert_relative_eq!(camera.yaw(), 0.0, epsilon = 1e-4);
        assert_relative_eq!(camera.front(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_scroll_zoom_is_clamped() {
        let mut camera = FlyCamera::default();
        camera.process_mouse_scroll(10.0);
        assert_relative_eq!(camera.zoom(), 35.0);
        camera.process_mouse_scroll(100.0);
        assert_relative_eq!(camera.zoom(), 1.0);
        camera.process_mouse_scroll(-100.0);
        assert_relative_eq!(camera.zoom(), 45.0);
    }

    #[test]
    fn test_view_matrix_maps_eye_to_origin() {
        let camera = FlyCamera::at(Vec3::new(1.0, 2.0, 3.0));
        let eye = camera
            .view_matrix()
            .transform_point(&crate::foundation::math::Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(eye.coords, Vec3::zeros(), epsilon = 1e-6);
    }
}
