//! Immutable scene: the shape list and the kd-tree built over it.

use crate::kdtree::{KdTree, KdTreeConfig, KdTreeError, KdTreeStats, QueryStats};
use crate::Shape;
use kdtrace_math::{Aabb, Ray, Vec3};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error(transparent)]
    Index(#[from] KdTreeError),

    #[error("Shape {index} has an invalid index of refraction: {ior}")]
    InvalidIndexOfRefraction { index: usize, ior: f64 },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Closest intersection found along a ray.
#[derive(Debug, Clone, Copy)]
pub struct RayHit<'a> {
    pub t: f64,
    pub point: Vec3,
    pub normal: Vec3,
    pub shape: &'a Shape,
}

#[derive(Debug)]
pub struct Scene {
    tree: KdTree,
}

impl Scene {
    pub fn new(shapes: Vec<Shape>) -> SceneResult<Self> {
        Self::with_config(shapes, &KdTreeConfig::default())
    }

    pub fn with_config(shapes: Vec<Shape>, config: &KdTreeConfig) -> SceneResult<Self> {
        for (index, shape) in shapes.iter().enumerate() {
            if let Some(ior) = shape.surface().index_of_refraction {
                if !ior.is_finite() || ior <= 0.0 {
                    return Err(SceneError::InvalidIndexOfRefraction { index, ior });
                }
            }
        }

        let tree = KdTree::build(shapes, config)?;
        Ok(Self { tree })
    }

    pub fn shapes(&self) -> &[Shape] {
        self.tree.shapes()
    }

    pub fn bounds(&self) -> Aabb {
        self.tree.bounds()
    }

    pub fn tree_stats(&self) -> &KdTreeStats {
        self.tree.stats()
    }

    /// Visit every shape the ray could hit. See [`KdTree::query`].
    pub fn query<F>(&self, ray: &Ray, visitor: F) -> QueryStats
    where
        F: FnMut(&Shape),
    {
        self.tree.query(ray, visitor)
    }

    /// Nearest hit with t in (0, t_max].
    pub fn nearest_hit(&self, ray: &Ray, t_max: f64) -> (Option<RayHit<'_>>, QueryStats) {
        let shapes = self.tree.shapes();
        let mut closest: Option<(f64, &Shape)> = None;
        let stats = self.tree.query_indices(ray, |index| {
            let shape = &shapes[index];
            let limit = closest.map_or(t_max, |(t, _)| t);
            if let Some(t) = shape.intersect(ray, limit) {
                // Equal distances keep the first shape seen
                if closest.map_or(true, |(best, _)| t < best) {
                    closest = Some((t, shape));
                }
            }
        });

        let hit = closest.map(|(t, shape)| {
            let point = ray.at(t);
            RayHit {
                t,
                point,
                normal: shape.normal_at(point),
                shape,
            }
        });
        (hit, stats)
    }

    /// True if anything blocks the ray in (0, t_max].
    pub fn occluded(&self, ray: &Ray, t_max: f64) -> (bool, QueryStats) {
        let mut blocked = false;
        let stats = self.tree.query(ray, |shape| {
            if !blocked && shape.intersect(ray, t_max).is_some() {
                blocked = true;
            }
        });
        (blocked, stats)
    }
}
