//! Sphere primitive.

use crate::shape::{is_finite, ShapeError, ShapeResult};
use crate::Surface;
use kdtrace_math::{Aabb, Ray, Vec3};

#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f64,
    surface: Surface,
    bbox: Aabb,
}

impl Sphere {
    /// Create a sphere. The radius must be finite and strictly positive.
    pub fn new(center: Vec3, radius: f64, surface: Surface) -> ShapeResult<Self> {
        if !is_finite(center) {
            return Err(ShapeError::NonFinite("sphere center"));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ShapeError::InvalidRadius(radius));
        }

        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Ok(Self {
            center,
            radius,
            surface,
            bbox,
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        (point - self.center).normalize()
    }

    /// Smallest positive root of |o + t·d - c|² = r², if it is <= t_max.
    pub fn intersect(&self, ray: &Ray, t_max: f64) -> Option<f64> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();
        let near = (h - sqrtd) / a;
        let far = (h + sqrtd) / a;

        let root = if near > 0.0 {
            near
        } else if far > 0.0 {
            far
        } else {
            return None;
        };
        (root <= t_max).then_some(root)
    }
}
