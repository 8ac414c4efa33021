//! Column strips: the unit of parallel work for one frame.
//!
//! The image is cut into vertical strips spanning its full height. Each
//! strip is rendered by one task into its own pixel block, so no pixel is
//! written by more than one task.

use crate::renderer::{render_pixel, FrameStats, RenderError, RenderResult};
use crate::{Camera, Color, RenderConfig, Scene, ShadingEngine};

/// A vertical band of image columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strip {
    /// First column of the strip
    pub x: u32,
    /// Number of columns
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Position of this strip, left to right
    pub index: usize,
}

impl Strip {
    pub fn new(x: u32, width: u32, height: u32, index: usize) -> Self {
        Self { x, width, height, index }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Split `width` columns into `count` strips of equal width, the remainder
/// going to the last strip.
///
/// `count` is clamped to [1, width] so no strip is empty.
pub fn generate_strips(width: u32, height: u32, count: usize) -> Vec<Strip> {
    let count = count.clamp(1, width.max(1) as usize) as u32;
    let base = width / count;

    (0..count)
        .map(|i| {
            let x = i * base;
            let w = if i + 1 == count { width - x } else { base };
            Strip::new(x, w, height, i as usize)
        })
        .collect()
}

/// Pixels of one rendered strip and the work it took.
#[derive(Debug, Clone)]
pub struct StripResult {
    pub strip: Strip,
    /// Row-major within the strip
    pub pixels: Vec<Color>,
    pub stats: FrameStats,
}

/// Render every pixel of a strip with a private shading engine.
///
/// Fails on the first pixel whose color is not finite.
pub fn render_strip(
    strip: &Strip,
    scene: &Scene,
    camera: &Camera,
    config: &RenderConfig,
) -> RenderResult<StripResult> {
    let mut engine = ShadingEngine::new(scene, &config.shading);
    let mut pixels = Vec::with_capacity(strip.pixel_count());

    for y in 0..strip.height {
        for local_x in 0..strip.width {
            let x = strip.x + local_x;
            let color = render_pixel(&mut engine, camera, x, y, config);
            if !color.is_finite() {
                return Err(RenderError::NonFiniteColor { x, y });
            }
            pixels.push(color);
        }
    }

    let query = engine.stats();
    Ok(StripResult {
        strip: *strip,
        pixels,
        stats: FrameStats {
            rays_cast: engine.rays_cast(),
            nodes_visited: query.nodes_visited,
            shapes_visited: query.shapes_visited,
            ..Default::default()
        },
    })
}
