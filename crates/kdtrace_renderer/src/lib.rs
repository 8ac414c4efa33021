//! kdtrace renderer - Whitted ray tracing over an SAH kd-tree.
//!
//! Shapes (triangles and spheres) are indexed by a kd-tree built once per
//! scene. A recursive shading engine traces reflection, refraction and
//! shadow rays through it, and the renderer splits each frame into column
//! strips rendered in parallel on a rayon thread pool.

mod camera;
mod kdtree;
mod renderer;
mod scene;
mod shading;
mod shape;
mod sphere;
mod strip;
mod surface;
mod triangle;

pub use camera::{Camera, CameraState};
pub use kdtree::{
    KdNode, KdTree, KdTreeConfig, KdTreeError, KdTreeResult, KdTreeStats, QueryStats, SplitStrategy,
};
pub use renderer::{
    color_to_rgba, render_pixel, FrameResult, FrameStats, ImageBuffer, RenderConfig, RenderError,
    RenderResult, Renderer,
};
pub use scene::{RayHit, Scene, SceneError, SceneResult};
pub use shading::{
    fresnel, reflect, refract, PointLight, ShadingConfig, ShadingEngine, MAX_RECURSION_DEPTH,
};
pub use shape::{Shape, ShapeError, ShapeResult};
pub use sphere::Sphere;
pub use strip::{generate_strips, render_strip, Strip, StripResult};
pub use surface::{Color, Surface};
pub use triangle::Triangle;

/// Re-export math types from kdtrace_math
pub use kdtrace_math::{Aabb, Interval, Ray, Vec3};
