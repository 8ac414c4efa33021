use crate::Vec3;

/// Distance a secondary ray's origin is pushed along its direction so it
/// does not re-hit the surface it leaves.
pub const SHIFT_EPSILON: f64 = 1e-5;

/// A ray with an origin and a direction.
///
/// The direction is not required to be unit length; `at(t)` is measured in
/// multiples of it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Build a secondary ray whose origin is moved `SHIFT_EPSILON` along
    /// the (normalized) direction.
    pub fn shifted(origin: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize();
        Self {
            origin: origin + direction * SHIFT_EPSILON,
            direction,
        }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-0.5), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_shifted() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let ray = Ray::shifted(origin, Vec3::new(0.0, 0.0, 10.0));

        assert_eq!(ray.direction, Vec3::Z);
        assert!((ray.origin - origin - Vec3::new(0.0, 0.0, SHIFT_EPSILON)).length() < 1e-12);
    }
}
