//! Frame rendering on a fixed-size worker pool.
//!
//! One frame is a fork-join over column strips: every strip is rendered by
//! its own task with a private shading engine, the caller blocks until all
//! tasks finish, and the strips are then stitched into one image. A failed
//! strip fails the frame.

use crate::strip::{generate_strips, render_strip, StripResult};
use crate::{Camera, CameraState, Color, Scene, ShadingConfig, ShadingEngine};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Non-finite color at pixel ({x}, {y})")]
    NonFiniteColor { x: u32, y: u32 },
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Screen rectangle size in world units
    pub screen_width: f64,
    pub screen_height: f64,
    /// Distance from the eye to the screen
    pub eye_distance: f64,
    /// Jittered samples per pixel; 1 samples the pixel centre
    pub samples_per_pixel: u32,
    /// Worker threads; `None` uses the hardware parallelism
    pub threads: Option<usize>,
    /// Seed for antialiasing jitter
    pub seed: u64,
    pub shading: ShadingConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            screen_width: 8.0,
            screen_height: 6.0,
            eye_distance: 10.0,
            samples_per_pixel: 1,
            threads: None,
            seed: 0,
            shading: ShadingConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: String| Err(RenderError::InvalidConfig(msg));

        if self.width == 0 || self.height == 0 {
            return invalid(format!("resolution {}x{} is empty", self.width, self.height));
        }
        for (name, value) in [
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
            ("eye_distance", self.eye_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        if self.samples_per_pixel == 0 {
            return invalid("samples_per_pixel must be at least 1".to_string());
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1".to_string());
        }

        let shading = &self.shading;
        if !(0.0..=1.0).contains(&shading.ambient_light) {
            return invalid(format!("ambient_light must be in [0, 1], got {}", shading.ambient_light));
        }
        if !shading.light.intensity.is_finite() || shading.light.intensity < 0.0 {
            return invalid(format!("light intensity must be non-negative, got {}", shading.light.intensity));
        }
        if !shading.light.position.is_finite() || !shading.background.is_finite() {
            return invalid("light position and background must be finite".to_string());
        }
        Ok(())
    }
}

/// Work counters for a frame, summed over its strips.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub rays_cast: u64,
    pub nodes_visited: u64,
    pub shapes_visited: u64,
    pub strips: usize,
    pub elapsed: Duration,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, other: Self) {
        self.rays_cast += other.rays_cast;
        self.nodes_visited += other.nodes_visited;
        self.shapes_visited += other.shapes_visited;
        self.strips += other.strips;
        self.elapsed += other.elapsed;
    }
}

/// Row-major frame buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[pixel_offset(self.width, x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[pixel_offset(self.width, x, y)] = color;
    }

    /// Copy a rendered strip into its columns.
    fn write_strip(&mut self, result: &StripResult) {
        let strip = &result.strip;
        for (row, colors) in result.pixels.chunks(strip.width as usize).enumerate() {
            let start = row * self.width as usize + strip.x as usize;
            self.pixels[start..start + colors.len()].copy_from_slice(colors);
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|color| color_to_rgba(*color)).collect()
    }
}

/// Row-major index of pixel (x, y), computed in `usize` so large frames
/// do not overflow.
fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Convert a color to 8-bit RGBA.
///
/// Colors brighter than 1.0 in any channel are scaled down as a whole so
/// the hue survives; negative channels are clamped to zero.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let color = color.max(Color::ZERO);
    let peak = color.max_element();
    let color = if peak > 1.0 { color / peak } else { color };
    [
        (255.0 * color.x) as u8,
        (255.0 * color.y) as u8,
        (255.0 * color.z) as u8,
        255,
    ]
}

/// Average of `samples_per_pixel` rays through pixel (x, y).
///
/// Jitter comes from an RNG seeded by the pixel coordinates, so a pixel's
/// color does not depend on which strip or thread renders it.
pub fn render_pixel(
    engine: &mut ShadingEngine<'_>,
    camera: &Camera,
    x: u32,
    y: u32,
    config: &RenderConfig,
) -> Color {
    if config.samples_per_pixel <= 1 {
        return engine.color_for_ray(&camera.get_ray(x, y, 0.5, 0.5));
    }

    let mut rng = StdRng::seed_from_u64(pixel_seed(config.seed, x, y));
    let mut pixel_color = Color::ZERO;
    for _ in 0..config.samples_per_pixel {
        let ray = camera.get_ray(x, y, rng.gen::<f64>(), rng.gen::<f64>());
        pixel_color += engine.color_for_ray(&ray);
    }
    pixel_color / config.samples_per_pixel as f64
}

fn pixel_seed(seed: u64, x: u32, y: u32) -> u64 {
    let pixel = ((y as u64) << 32) | x as u64;
    seed ^ pixel.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// A rendered frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub image: ImageBuffer,
    pub stats: FrameStats,
}

/// Renders frames of a scene on a dedicated thread pool.
pub struct Renderer {
    config: RenderConfig,
    pool: rayon::ThreadPool,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> RenderResult<Self> {
        config.validate()?;

        let threads = config.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kdtrace-strip-{i}"))
            .build()?;

        log::info!(
            "Renderer: {}x{}, {} sample(s)/pixel, max depth {}, {} worker thread(s)",
            config.width,
            config.height,
            config.samples_per_pixel,
            config.shading.max_depth,
            threads
        );

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Render one frame. Blocks until every strip is done.
    pub fn render_frame(&self, scene: &Scene, state: &CameraState) -> RenderResult<FrameResult> {
        let start = Instant::now();
        let config = &self.config;
        let camera = Camera::new(state, config);
        let strips = generate_strips(config.width, config.height, self.thread_count());

        let results = self.pool.install(|| {
            strips
                .par_iter()
                .map(|strip| render_strip(strip, scene, &camera, config))
                .collect::<RenderResult<Vec<_>>>()
        })?;

        let mut image = ImageBuffer::new(config.width, config.height);
        let mut stats = FrameStats::default();
        for result in &results {
            image.write_strip(result);
            stats += result.stats;
        }
        stats.strips = results.len();
        stats.elapsed = start.elapsed();

        log::debug!(
            "Frame: {} strips, {} rays, {} nodes, {} shape tests in {:.1?}",
            stats.strips,
            stats.rays_cast,
            stats.nodes_visited,
            stats.shapes_visited,
            stats.elapsed
        );

        Ok(FrameResult { image, stats })
    }
}
