//! Double-precision algebra for the kd-tree ray tracer.
//!
//! Vectors and matrices come from `glam`; this crate adds the ray,
//! interval and bounding-box types the spatial index is built on.

// Re-export glam's f64 types under the names the renderer uses
pub use glam::{DMat4 as Mat4, DVec3 as Vec3};

mod aabb;
mod interval;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{Ray, SHIFT_EPSILON};
pub use transform::Mat4Ext;
