// Camera transform helpers for Mat4.
//
// glam already provides transform_point3() and transform_vector3(); this
// adds the one rotation convention the renderer uses everywhere.

use crate::{Mat4, Vec3};
use glam::{DQuat, EulerRot};

/// Extension trait for Mat4 with camera construction helpers.
pub trait Mat4Ext {
    /// Rotation about x, then y, then z (angles in radians).
    fn from_rotation_xyz(angles: Vec3) -> Self;

    /// Rotate by `angles` (x, y, z order), then translate to `position`.
    fn camera_to_world(position: Vec3, angles: Vec3) -> Self;

    /// Angles that rebuild this matrix's rotation with `from_rotation_xyz`.
    fn rotation_xyz(&self) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn from_rotation_xyz(angles: Vec3) -> Self {
        Mat4::from_rotation_z(angles.z) * Mat4::from_rotation_y(angles.y) * Mat4::from_rotation_x(angles.x)
    }

    fn camera_to_world(position: Vec3, angles: Vec3) -> Self {
        Mat4::from_translation(position) * Mat4::from_rotation_xyz(angles)
    }

    fn rotation_xyz(&self) -> Vec3 {
        // ZYX composes as Rz * Ry * Rx, the same product as above
        let (z, y, x) = DQuat::from_mat4(self).to_euler(EulerRot::ZYX);
        Vec3::new(x, y, z)
    }
}
