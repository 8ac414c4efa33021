use anyhow::{Context, Result};
use clap::Parser;
use kdtrace_math::{Mat4, Mat4Ext, Vec3};
use kdtrace_renderer::{
    CameraState, ImageBuffer, KdTreeConfig, RenderConfig, Renderer, Scene, SplitStrategy,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

mod demo_scene;

/// Render the built-in demo scene to PNG.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON settings file; missing fields fall back to defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output image path
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Antialiasing samples per pixel
    #[arg(short, long)]
    samples: Option<u32>,

    /// Worker threads (defaults to the number of cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Frames to render while turning the camera around the scene
    #[arg(short, long, default_value_t = 1)]
    frames: u32,

    /// Build the kd-tree with mean-centroid splits instead of the SAH sweep
    #[arg(long)]
    mean_split: bool,
}

/// Contents of the settings file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    render: RenderConfig,
    tree: KdTreeConfig,
    camera: CameraState,
}

impl Settings {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(width) = args.width {
            self.render.width = width;
        }
        if let Some(height) = args.height {
            self.render.height = height;
        }
        if let Some(samples) = args.samples {
            self.render.samples_per_pixel = samples;
        }
        if args.threads.is_some() {
            self.render.threads = args.threads;
        }
        if args.mean_split {
            self.tree.strategy = SplitStrategy::MeanCentroid;
        }
    }
}

/// Camera for frame `index` of `count`, turned about the world y axis.
fn turntable(base: &CameraState, index: u32, count: u32) -> CameraState {
    let angle = std::f64::consts::TAU * index as f64 / count as f64;
    let turn = Mat4::from_rotation_y(angle);
    CameraState {
        position: turn.transform_point3(base.position),
        rotation: (turn * Mat4::from_rotation_xyz(base.rotation)).rotation_xyz(),
    }
}

fn frame_path(output: &Path, index: u32, count: u32) -> PathBuf {
    if count <= 1 {
        return output.to_path_buf();
    }
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("render");
    let ext = output.extension().and_then(|s| s.to_str()).unwrap_or("png");
    output.with_file_name(format!("{stem}_{index:04}.{ext}"))
}

fn save_png(image: &ImageBuffer, path: &Path) -> Result<()> {
    let rgba = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .context("Frame buffer does not match its resolution")?;
    rgba.save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    settings.apply_args(&args);

    let shapes = demo_scene::build_demo_scene()?;
    let scene = Scene::with_config(shapes, &settings.tree).context("Failed to build scene")?;
    log::info!("Scene: {} shapes, bounds {:?}", scene.shapes().len(), scene.bounds());

    let renderer = Renderer::new(settings.render)?;
    let frames = args.frames.max(1);

    for index in 0..frames {
        let camera = turntable(&settings.camera, index, frames);
        let frame = renderer
            .render_frame(&scene, &camera)
            .with_context(|| format!("Frame {index} failed"))?;

        let path = frame_path(&args.output, index, frames);
        save_png(&frame.image, &path)?;

        let stats = &frame.stats;
        log::info!(
            "Frame {}/{} -> {}: {:.1?}, {} rays, {:.1} nodes/ray, {:.1} shapes/ray",
            index + 1,
            frames,
            path.display(),
            stats.elapsed,
            stats.rays_cast,
            stats.nodes_visited as f64 / stats.rays_cast.max(1) as f64,
            stats.shapes_visited as f64 / stats.rays_cast.max(1) as f64
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_path() {
        let out = Path::new("out/render.png");
        assert_eq!(frame_path(out, 0, 1), PathBuf::from("out/render.png"));
        assert_eq!(frame_path(out, 3, 10), PathBuf::from("out/render_0003.png"));
    }

    #[test]
    fn test_turntable_keeps_looking_at_origin() {
        let base = CameraState::default();
        let camera = turntable(&base, 1, 4);
        // A quarter turn about y moves the screen from +z to +x
        assert!((camera.position - Vec3::new(290.0, 0.0, 0.0)).length() < 1e-9);
        let forward = Mat4::from_rotation_xyz(camera.rotation).transform_vector3(-Vec3::Z);
        assert!((forward - -Vec3::X).length() < 1e-6, "{forward:?}");
    }

    #[test]
    fn test_turntable_turns_tilted_camera_about_world_y() {
        let base = CameraState::default()
            .with_position(Vec3::new(10.0, 40.0, 250.0))
            .with_rotation(Vec3::new(-0.15, 0.2, 0.35));
        let angle = std::f64::consts::TAU / 3.0;
        let camera = turntable(&base, 1, 3);

        let expected = Mat4::from_rotation_y(angle) * Mat4::camera_to_world(base.position, base.rotation);
        let actual = Mat4::camera_to_world(camera.position, camera.rotation);
        for p in [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, -2.0, -10.0)] {
            let diff = actual.transform_point3(p) - expected.transform_point3(p);
            assert!(diff.length() < 1e-6, "{p:?}: {diff:?}");
        }
    }

    #[test]
    fn test_settings_parse() {
        let settings: Settings = serde_json::from_str(
            r#"{ "render": { "width": 64 }, "tree": { "strategy": "mean_centroid" }, "camera": { "position": [0.0, 20.0, 300.0] } }"#,
        )
        .unwrap();
        assert_eq!(settings.render.width, 64);
        assert_eq!(settings.tree.strategy, SplitStrategy::MeanCentroid);
        assert_eq!(settings.camera.position, Vec3::new(0.0, 20.0, 300.0));
        assert_eq!(settings.tree.max_leaf_shapes, 4);
    }
}
