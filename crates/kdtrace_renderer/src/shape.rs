//! Closed set of primitive shapes the kd-tree indexes.

use crate::{Sphere, Surface, Triangle};
use kdtrace_math::{Aabb, Ray, Vec3};
use thiserror::Error;

/// Errors raised while constructing a shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Degenerate triangle: vertices {0:?}, {1:?}, {2:?} span no area")]
    DegenerateTriangle(Vec3, Vec3, Vec3),

    #[error("Invalid sphere radius: {0}")]
    InvalidRadius(f64),

    #[error("Non-finite coordinate in {0}")]
    NonFinite(&'static str),
}

pub type ShapeResult<T> = Result<T, ShapeError>;

/// A primitive shape with its surface.
#[derive(Debug, Clone)]
pub enum Shape {
    Triangle(Triangle),
    Sphere(Sphere),
}

impl Shape {
    pub fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Triangle(t) => t.bounding_box(),
            Shape::Sphere(s) => s.bounding_box(),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        match self {
            Shape::Triangle(t) => t.centroid(),
            Shape::Sphere(s) => s.center(),
        }
    }

    /// Unit surface normal at a point on the shape.
    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        match self {
            Shape::Triangle(t) => t.normal(),
            Shape::Sphere(s) => s.normal_at(point),
        }
    }

    /// Ray parameter of the nearest hit in (0, t_max], if any.
    #[inline]
    pub fn intersect(&self, ray: &Ray, t_max: f64) -> Option<f64> {
        match self {
            Shape::Triangle(t) => t.intersect(ray, t_max),
            Shape::Sphere(s) => s.intersect(ray, t_max),
        }
    }

    pub fn surface(&self) -> &Surface {
        match self {
            Shape::Triangle(t) => t.surface(),
            Shape::Sphere(s) => s.surface(),
        }
    }
}

impl From<Triangle> for Shape {
    fn from(triangle: Triangle) -> Self {
        Shape::Triangle(triangle)
    }
}

impl From<Sphere> for Shape {
    fn from(sphere: Sphere) -> Self {
        Shape::Sphere(sphere)
    }
}

pub(crate) fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
