//! Recursive Whitted-style shading.
//!
//! A ray that hits a glass surface (reflective and refractive) splits into
//! a reflection ray and a refraction ray weighted by the Fresnel
//! reflectance. Mirrors and purely refractive surfaces continue along one
//! ray. Everything else, and any surface reached once the depth budget is
//! spent, is shaded locally with an ambient term plus a shadowed Lambert
//! term from a single point light.

use crate::kdtree::QueryStats;
use crate::scene::RayHit;
use crate::{Color, Scene};
use kdtrace_math::{Ray, Vec3, SHIFT_EPSILON};
use serde::{Deserialize, Serialize};

/// Default bound on reflection/refraction recursion.
pub const MAX_RECURSION_DEPTH: u32 = 16;

/// Point light source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: f64,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::splat(100.0),
            intensity: 1.0,
        }
    }
}

/// Lighting and recursion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Fraction of the surface color visible without direct light, in [0, 1]
    pub ambient_light: f64,
    pub light: PointLight,
    pub max_depth: u32,
    /// Color of rays that leave the scene
    pub background: Color,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            ambient_light: 0.1,
            light: PointLight::default(),
            max_depth: MAX_RECURSION_DEPTH,
            background: Color::ZERO,
        }
    }
}

/// Mirror `direction` about `normal`.
#[inline]
pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - 2.0 * direction.dot(normal) * normal
}

/// Snell refraction of a unit `incident` direction through a boundary with
/// index of refraction `ior` (the other side is vacuum).
///
/// The normal may face either way; a positive cosine means the ray is
/// leaving the medium. Returns `None` on total internal reflection.
pub fn refract(incident: Vec3, normal: Vec3, ior: f64) -> Option<Vec3> {
    let mut cosi = incident.dot(normal).clamp(-1.0, 1.0);
    let (mut etai, mut etat) = (1.0, ior);
    let mut n = normal;
    if cosi < 0.0 {
        cosi = -cosi;
    } else {
        std::mem::swap(&mut etai, &mut etat);
        n = -normal;
    }

    let eta = etai / etat;
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    if k <= 0.0 {
        return None;
    }
    Some(incident * eta + n * (eta * cosi - k.sqrt()))
}

/// Fraction of light reflected at the boundary (unpolarized Fresnel).
///
/// Returns 1.0 under total internal reflection.
pub fn fresnel(incident: Vec3, normal: Vec3, ior: f64) -> f64 {
    let cosi = incident.dot(normal).clamp(-1.0, 1.0);
    let (etai, etat) = if cosi > 0.0 { (ior, 1.0) } else { (1.0, ior) };

    let sint = etai / etat * (1.0 - cosi * cosi).max(0.0).sqrt();
    if sint >= 1.0 {
        return 1.0;
    }

    let cost = (1.0 - sint * sint).max(0.0).sqrt();
    let cosi = cosi.abs();
    let rs = (etat * cosi - etai * cost) / (etat * cosi + etai * cost);
    let rp = (etai * cosi - etat * cost) / (etai * cosi + etat * cost);
    (rs * rs + rp * rp) / 2.0
}

/// Computes colors for rays against one scene.
///
/// An engine is cheap to create and not shared between threads; each
/// render task owns one and reads its counters when done.
pub struct ShadingEngine<'a> {
    scene: &'a Scene,
    config: &'a ShadingConfig,
    stats: QueryStats,
    rays_cast: u64,
}

impl<'a> ShadingEngine<'a> {
    pub fn new(scene: &'a Scene, config: &'a ShadingConfig) -> Self {
        Self {
            scene,
            config,
            stats: QueryStats::default(),
            rays_cast: 0,
        }
    }

    /// Traversal counters accumulated over every ray this engine cast.
    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    /// Primary, secondary and shadow rays cast so far.
    pub fn rays_cast(&self) -> u64 {
        self.rays_cast
    }

    pub fn color_for_ray(&mut self, ray: &Ray) -> Color {
        self.trace(ray, 0)
    }

    fn trace(&mut self, ray: &Ray, depth: u32) -> Color {
        self.rays_cast += 1;
        let (hit, stats) = self.scene.nearest_hit(ray, f64::INFINITY);
        self.stats += stats;

        let Some(hit) = hit else {
            return self.config.background;
        };

        let surface = *hit.shape.surface();
        if depth < self.config.max_depth {
            let direction = ray.direction.normalize();
            let normal = hit.normal;

            match (surface.reflective, surface.index_of_refraction) {
                (true, Some(ior)) => {
                    let kr = fresnel(direction, normal, ior);
                    let refraction = match refract(direction, normal, ior) {
                        Some(dir) if kr < 1.0 => self.trace(&Ray::shifted(hit.point, dir), depth + 1),
                        _ => Color::ZERO,
                    };
                    let reflection = self.trace(&Ray::shifted(hit.point, reflect(direction, normal)), depth + 1);
                    return reflection * kr + refraction * (1.0 - kr);
                }
                (false, Some(ior)) => {
                    // Total internal reflection sends everything back
                    let dir = refract(direction, normal, ior).unwrap_or_else(|| reflect(direction, normal));
                    return self.trace(&Ray::shifted(hit.point, dir), depth + 1);
                }
                (true, None) => {
                    return self.trace(&Ray::shifted(hit.point, reflect(direction, normal)), depth + 1);
                }
                (false, None) => {}
            }
        }

        self.local_color(&hit)
    }

    /// Ambient plus shadowed Lambert term.
    fn local_color(&mut self, hit: &RayHit<'_>) -> Color {
        let light = self.config.light;
        let ambient = self.config.ambient_light;
        let to_light = light.position - hit.point;
        let distance = to_light.length();

        let mut diffuse = 0.0;
        if distance > SHIFT_EPSILON {
            diffuse = hit.normal.dot(to_light / distance).max(0.0);
            if diffuse > 0.0 && self.in_shadow(hit.point, to_light, distance) {
                diffuse = 0.0;
            }
        }

        hit.shape.surface().color * (ambient + (1.0 - ambient) * diffuse * light.intensity)
    }

    /// Anything between the point and the light blocks it.
    fn in_shadow(&mut self, point: Vec3, to_light: Vec3, distance: f64) -> bool {
        self.rays_cast += 1;
        let shadow_ray = Ray::shifted(point, to_light);
        let (blocked, stats) = self.scene.occluded(&shadow_ray, distance - SHIFT_EPSILON);
        self.stats += stats;
        blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Shape, Sphere, Surface, Triangle};

    const RED: Color = Color::new(1.0, 0.0, 0.0);

    fn sphere(center: Vec3, radius: f64, surface: Surface) -> Shape {
        Sphere::new(center, radius, surface).unwrap().into()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_reflect() {
        let d = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(reflect(d, Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
        // Normal orientation does not matter
        assert_eq!(reflect(d, -Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_refract_normal_incidence_passes_straight() {
        let dir = refract(-Vec3::Z, Vec3::Z, 1.5).unwrap();
        assert!((dir - (-Vec3::Z)).length() < 1e-12);

        // Leaving the medium
        let dir = refract(-Vec3::Z, -Vec3::Z, 1.5).unwrap();
        assert!((dir - (-Vec3::Z)).length() < 1e-12);
    }

    #[test]
    fn test_refract_bends_toward_normal_on_entry() {
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let dir = refract(incident, Vec3::Y, 1.5).unwrap();

        // sin(theta_t) = sin(45°) / 1.5
        let sin_t = dir.normalize().x;
        assert_close(sin_t, std::f64::consts::FRAC_1_SQRT_2 / 1.5);
        assert!(dir.y < 0.0);
    }

    #[test]
    fn test_total_internal_reflection() {
        // 60° from the normal inside glass exceeds the critical angle (41.8°)
        let incident = Vec3::new(60f64.to_radians().sin(), 60f64.to_radians().cos(), 0.0);
        assert!(refract(incident, Vec3::Y, 1.5).is_none());
        assert_eq!(fresnel(incident, Vec3::Y, 1.5), 1.0);
    }

    #[test]
    fn test_fresnel_normal_incidence() {
        // ((1 - n) / (1 + n))²
        assert_close(fresnel(-Vec3::Z, Vec3::Z, 1.5), 0.04);
        assert_close(fresnel(Vec3::Z, Vec3::Z, 1.5), 0.04);
        assert!(fresnel(Vec3::new(0.999, -0.0447, 0.0).normalize(), Vec3::Y, 1.5) > 0.5);
    }

    #[test]
    fn test_no_hit_returns_background() {
        let scene = Scene::new(vec![sphere(Vec3::ZERO, 1.0, Surface::diffuse(RED))]).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);

        let config = ShadingConfig::default();
        assert_eq!(ShadingEngine::new(&scene, &config).color_for_ray(&ray), Color::ZERO);

        let config = ShadingConfig {
            background: Color::new(0.2, 0.3, 0.4),
            ..Default::default()
        };
        assert_eq!(
            ShadingEngine::new(&scene, &config).color_for_ray(&ray),
            Color::new(0.2, 0.3, 0.4)
        );
    }

    #[test]
    fn test_diffuse_lit_sphere() {
        let scene = Scene::new(vec![sphere(Vec3::ZERO, 40.0, Surface::diffuse(RED))]).unwrap();
        let config = ShadingConfig::default();
        let mut engine = ShadingEngine::new(&scene, &config);

        let color = engine.color_for_ray(&Ray::new(Vec3::new(0.0, 0.0, 300.0), -Vec3::Z));

        // Hit at (0, 0, 40) with normal +Z; light at (100, 100, 100)
        let to_light = Vec3::new(100.0, 100.0, 60.0);
        let diffuse = 60.0 / to_light.length();
        assert_close(color.x, 0.1 + 0.9 * diffuse);
        assert_eq!(color.y, 0.0);
        assert_eq!(color.z, 0.0);

        // Primary ray plus one shadow ray
        assert_eq!(engine.rays_cast(), 2);
        assert!(engine.stats().nodes_visited > 0);
    }

    #[test]
    fn test_light_behind_surface_gives_ambient() {
        let scene = Scene::new(vec![sphere(Vec3::ZERO, 40.0, Surface::diffuse(RED))]).unwrap();
        let config = ShadingConfig::default();
        let color = ShadingEngine::new(&scene, &config).color_for_ray(&Ray::new(Vec3::new(0.0, 0.0, -300.0), Vec3::Z));
        // Hit at (0, 0, -40), facing away from the light
        assert_eq!(color, RED * 0.1);
    }

    #[test]
    fn test_shadowed_point_gets_ambient() {
        let scene = Scene::new(vec![
            sphere(Vec3::ZERO, 40.0, Surface::diffuse(RED)),
            sphere(Vec3::new(50.0, 50.0, 70.0), 10.0, Surface::diffuse(Color::ONE)),
        ])
        .unwrap();
        let config = ShadingConfig::default();
        let color = ShadingEngine::new(&scene, &config).color_for_ray(&Ray::new(Vec3::new(0.0, 0.0, 300.0), -Vec3::Z));
        assert_eq!(color, RED * 0.1);
    }

    #[test]
    fn test_occluder_beyond_light_casts_no_shadow() {
        let scene = Scene::new(vec![
            sphere(Vec3::ZERO, 40.0, Surface::diffuse(RED)),
            sphere(Vec3::new(200.0, 200.0, 160.0), 10.0, Surface::diffuse(Color::ONE)),
        ])
        .unwrap();
        let config = ShadingConfig::default();
        let color = ShadingEngine::new(&scene, &config).color_for_ray(&Ray::new(Vec3::new(0.0, 0.0, 300.0), -Vec3::Z));
        assert!(color.x > 0.1 + 1e-6);
    }

    fn mirror_floor() -> Shape {
        Triangle::new(
            Vec3::new(-1000.0, -50.0, 1000.0),
            Vec3::new(1000.0, -50.0, 1000.0),
            Vec3::new(0.0, -50.0, -1000.0),
            Surface::mirror(Color::ONE),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_mirror_reflects_scene() {
        let scene = Scene::new(vec![
            mirror_floor(),
            sphere(Vec3::new(0.0, 0.0, -100.0), 20.0, Surface::diffuse(RED)),
        ])
        .unwrap();
        let config = ShadingConfig::default();
        let mut engine = ShadingEngine::new(&scene, &config);

        // Down onto the floor at (0, -50, 0), bouncing toward the sphere
        let toward_floor = Ray::new(Vec3::new(0.0, 0.0, 100.0), Vec3::new(0.0, -50.0, -100.0));
        let color = engine.color_for_ray(&toward_floor);
        assert!(color.x > 0.0 && color.y == 0.0 && color.z == 0.0, "{color:?}");

        // Straight down and back up into empty space
        let down = Ray::new(Vec3::new(300.0, 0.0, 300.0), -Vec3::Y);
        assert_eq!(engine.color_for_ray(&down), Color::ZERO);
    }

    #[test]
    fn test_recursion_is_bounded() {
        let wall = |z: f64, flip: bool| -> Shape {
            let (a, b) = (Vec3::new(-100.0, -100.0, z), Vec3::new(100.0, -100.0, z));
            let c = Vec3::new(0.0, 100.0, z);
            let tri = if flip { Triangle::new(a, c, b, Surface::mirror(RED)) } else { Triangle::new(a, b, c, Surface::mirror(RED)) };
            tri.unwrap().into()
        };
        // Two mirrors facing each other
        let scene = Scene::new(vec![wall(-10.0, false), wall(10.0, true)]).unwrap();

        for max_depth in [0, 3, MAX_RECURSION_DEPTH] {
            let config = ShadingConfig {
                max_depth,
                ..Default::default()
            };
            let mut engine = ShadingEngine::new(&scene, &config);
            let color = engine.color_for_ray(&Ray::new(Vec3::ZERO, -Vec3::Z));

            // One trace per level plus at most one shadow ray at the end
            let traces = max_depth as u64 + 1;
            assert!(engine.rays_cast() == traces || engine.rays_cast() == traces + 1);
            // The final surface is shaded locally
            assert!(color.x >= 0.1 * RED.x - 1e-12);
        }
    }

    #[test]
    fn test_total_internal_reflection_equals_reflection() {
        let glass = Surface::glass(Color::new(0.2, 0.6, 1.0), 1.5);
        let scene = Scene::new(vec![sphere(Vec3::ZERO, 10.0, glass)]).unwrap();
        let config = ShadingConfig::default();

        // From inside, grazing the wall well past the critical angle
        let ray = Ray::new(Vec3::new(0.0, 9.0, 0.0), Vec3::X);
        let hit_point = Vec3::new((100.0f64 - 81.0).sqrt(), 9.0, 0.0);
        let normal = hit_point / 10.0;
        assert_eq!(fresnel(Vec3::X, normal, 1.5), 1.0);
        assert!(refract(Vec3::X, normal, 1.5).is_none());

        let mut engine = ShadingEngine::new(&scene, &config);
        let color = engine.color_for_ray(&ray);

        let (hit, _) = scene.nearest_hit(&ray, f64::INFINITY);
        let hit = hit.unwrap();
        let reflected = Ray::shifted(hit.point, reflect(Vec3::X, hit.normal));
        let mut reference = ShadingEngine::new(&scene, &config);
        let reflection = reference.trace(&reflected, 1);

        assert_eq!(color, reflection);
        assert!(color.length() > 0.0);
    }

    #[test]
    fn test_glass_blends_reflection_and_refraction() {
        let green = Color::new(0.0, 1.0, 0.0);
        let blue = Color::new(0.0, 0.0, 1.0);
        let backdrop = Triangle::new(
            Vec3::new(-500.0, -500.0, 200.0),
            Vec3::new(500.0, -500.0, 200.0),
            Vec3::new(0.0, 500.0, 200.0),
            Surface::diffuse(green),
        )
        .unwrap();
        let scene = Scene::new(vec![
            sphere(Vec3::ZERO, 10.0, Surface::glass(Color::ONE, 1.5)),
            sphere(Vec3::new(0.0, 0.0, -50.0), 20.0, Surface::diffuse(blue)),
            backdrop.into(),
        ])
        .unwrap();
        let config = ShadingConfig::default();

        // Head-on, so the reflection goes back to the backdrop behind the eye
        let ray = Ray::new(Vec3::new(0.0, 0.0, 100.0), -Vec3::Z);
        let color = ShadingEngine::new(&scene, &config).color_for_ray(&ray);

        let hit = scene.nearest_hit(&ray, f64::INFINITY).0.unwrap();
        assert_eq!(hit.point, Vec3::new(0.0, 0.0, 10.0));
        let kr = fresnel(-Vec3::Z, hit.normal, 1.5);
        assert_close(kr, 0.04);

        let reflected = Ray::shifted(hit.point, reflect(-Vec3::Z, hit.normal));
        let refracted = Ray::shifted(hit.point, refract(-Vec3::Z, hit.normal, 1.5).unwrap());
        let reflection = ShadingEngine::new(&scene, &config).trace(&reflected, 1);
        let refraction = ShadingEngine::new(&scene, &config).trace(&refracted, 1);
        assert!(reflection.y > 0.0 && reflection.z == 0.0, "{reflection:?}");
        // Mostly the blue sphere, plus a little backdrop from internal bounces
        assert!(refraction.z > refraction.y, "{refraction:?}");

        let expected = reflection * 0.04 + refraction * 0.96;
        assert!((color - expected).length() < 1e-12, "{color:?} != {expected:?}");
        let swapped = reflection * 0.96 + refraction * 0.04;
        assert!((color - swapped).length() > 1e-3);
    }

    #[test]
    fn test_refractive_sphere_shows_what_is_behind() {
        let scene = Scene::new(vec![
            sphere(Vec3::new(0.0, 0.0, 50.0), 10.0, Surface::refractive(Color::ONE, 1.5)),
            sphere(Vec3::ZERO, 20.0, Surface::diffuse(RED)),
        ])
        .unwrap();
        let config = ShadingConfig::default();
        let color = ShadingEngine::new(&scene, &config).color_for_ray(&Ray::new(Vec3::new(0.0, 0.0, 300.0), -Vec3::Z));
        assert!(color.x > 0.0 && color.y == 0.0 && color.z == 0.0, "{color:?}");
    }
}
