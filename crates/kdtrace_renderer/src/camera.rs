//! Camera placement and primary ray generation.
//!
//! The camera's local frame has the screen rectangle centred on the origin
//! in the z = 0 plane and the eye on the +z axis, `eye_distance` behind it.
//! Rays leave the eye through points on the screen, so an unrotated camera
//! looks down -z with +x to the right and +y up. Pixel (0, 0) is the
//! top-left corner of the image.

use crate::RenderConfig;
use kdtrace_math::{Mat4, Mat4Ext, Ray, Vec3};
use serde::{Deserialize, Serialize};

/// Where the camera's screen sits and how it is turned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    /// World position of the screen centre
    pub position: Vec3,
    /// Rotation angles in radians, applied about x, then y, then z
    pub rotation: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 290.0),
            rotation: Vec3::ZERO,
        }
    }
}

impl CameraState {
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Per-frame ray generator derived from a `CameraState` and the
/// resolution/screen settings.
#[derive(Debug, Clone)]
pub struct Camera {
    to_world: Mat4,
    eye: Vec3,
    x_start: f64,
    y_start: f64,
    x_step: f64,
    y_step: f64,
}

impl Camera {
    pub fn new(state: &CameraState, config: &RenderConfig) -> Self {
        let to_world = Mat4::camera_to_world(state.position, state.rotation);
        let eye = to_world.transform_point3(Vec3::new(0.0, 0.0, config.eye_distance));

        Self {
            to_world,
            eye,
            x_start: -config.screen_width / 2.0,
            y_start: config.screen_height / 2.0,
            x_step: config.screen_width / config.width as f64,
            y_step: config.screen_height / config.height as f64,
        }
    }

    /// World position of the eye.
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Ray from the eye through pixel (x, y), offset within the pixel by
    /// (offset_x, offset_y) in [0, 1). The centre is (0.5, 0.5).
    pub fn get_ray(&self, x: u32, y: u32, offset_x: f64, offset_y: f64) -> Ray {
        let local = Vec3::new(
            self.x_start + (x as f64 + offset_x) * self.x_step,
            self.y_start - (y as f64 + offset_y) * self.y_step,
            0.0,
        );
        let screen_point = self.to_world.transform_point3(local);
        Ray::new(self.eye, screen_point - self.eye)
    }
}
