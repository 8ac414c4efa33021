//! Triangle primitive.
//!
//! Intersection solves the ray/plane system with Cramer's rule written as
//! cross and dot products of the ray and the two edges (Möller-Trumbore).

use crate::shape::{is_finite, ShapeError, ShapeResult};
use crate::Surface;
use kdtrace_math::{Aabb, Ray, Vec3};

/// Rays whose direction is within this cosine of the triangle plane are
/// treated as parallel to it.
const PARALLEL_COSINE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    /// |edge1 × edge2|, twice the area
    cross_length: f64,
    /// Unit face normal; orientation follows vertex order
    normal: Vec3,
    surface: Surface,
    bbox: Aabb,
}

impl Triangle {
    /// Create a triangle from three vertices in counter-clockwise order
    /// around the desired outward normal.
    ///
    /// Fails for non-finite vertices or vertices that span no area.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, surface: Surface) -> ShapeResult<Self> {
        if !(is_finite(v0) && is_finite(v1) && is_finite(v2)) {
            return Err(ShapeError::NonFinite("triangle vertex"));
        }

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let cross = edge1.cross(edge2);
        let cross_length = cross.length();
        if cross_length <= f64::EPSILON * edge1.length() * edge2.length() {
            return Err(ShapeError::DegenerateTriangle(v0, v1, v2));
        }

        let bbox = Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2));

        Ok(Self {
            v0,
            v1,
            v2,
            edge1,
            edge2,
            cross_length,
            normal: cross / cross_length,
            surface,
            bbox,
        })
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Hit iff t ∈ (0, t_max], γ ∈ [0, 1] and β ∈ [0, 1 - γ].
    pub fn intersect(&self, ray: &Ray, t_max: f64) -> Option<f64> {
        let h = ray.direction.cross(self.edge2);
        let det = self.edge1.dot(h);

        if det.abs() <= PARALLEL_COSINE * ray.direction.length() * self.cross_length {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
        let q = s.cross(self.edge1);

        let gamma = inv_det * ray.direction.dot(q);
        if !(0.0..=1.0).contains(&gamma) {
            return None;
        }

        let beta = inv_det * s.dot(h);
        if beta < 0.0 || beta > 1.0 - gamma {
            return None;
        }

        let t = inv_det * self.edge2.dot(q);
        (t > 0.0 && t <= t_max).then_some(t)
    }
}
