//! Built-in demo scene.

use anyhow::Result;
use kdtrace_math::Vec3;
use kdtrace_renderer::{Color, Shape, Sphere, Surface, Triangle};

/// Ground quad, a few feature spheres, a tetrahedron and a grid of small
/// spheres to give the kd-tree something to split.
pub fn build_demo_scene() -> Result<Vec<Shape>> {
    let mut shapes: Vec<Shape> = Vec::new();

    // Ground at y = -40, normal up
    let ground = Surface::diffuse(Color::new(0.75, 0.75, 0.7));
    let (a, b) = (Vec3::new(-400.0, -40.0, -400.0), Vec3::new(-400.0, -40.0, 400.0));
    let (c, d) = (Vec3::new(400.0, -40.0, 400.0), Vec3::new(400.0, -40.0, -400.0));
    shapes.push(Triangle::new(a, b, c, ground)?.into());
    shapes.push(Triangle::new(a, c, d, ground)?.into());

    shapes.push(Sphere::new(Vec3::ZERO, 40.0, Surface::diffuse(Color::new(0.9, 0.1, 0.1)))?.into());
    shapes.push(Sphere::new(Vec3::new(-70.0, -10.0, 50.0), 30.0, Surface::glass(Color::ONE, 1.5))?.into());
    shapes.push(Sphere::new(Vec3::new(80.0, 0.0, -30.0), 40.0, Surface::mirror(Color::ONE))?.into());

    shapes.extend(tetrahedron(
        Vec3::new(30.0, -40.0, 80.0),
        25.0,
        Surface::diffuse(Color::new(0.2, 0.5, 0.9)),
    )?);

    let small = Surface::diffuse(Color::new(0.3, 0.8, 0.3));
    for i in 0..6 {
        for j in 0..6 {
            let center = Vec3::new(-150.0 + i as f64 * 60.0, -34.0, -150.0 - j as f64 * 40.0);
            shapes.push(Sphere::new(center, 6.0, small)?.into());
        }
    }

    Ok(shapes)
}

/// Four outward-facing triangles resting on `base` with edge `size`.
fn tetrahedron(base: Vec3, size: f64, surface: Surface) -> Result<Vec<Shape>> {
    let h = size * (2.0f64 / 3.0).sqrt();
    let r = size / 3.0f64.sqrt();
    let p0 = base + Vec3::new(r, 0.0, 0.0);
    let p1 = base + Vec3::new(-r / 2.0, 0.0, size / 2.0);
    let p2 = base + Vec3::new(-r / 2.0, 0.0, -size / 2.0);
    let apex = base + Vec3::new(0.0, h, 0.0);

    let faces = [(p0, p1, p2), (p0, p2, apex), (p2, p1, apex), (p1, p0, apex)];
    faces
        .into_iter()
        .map(|(a, b, c)| -> Result<Shape> { Ok(Triangle::new(a, b, c, surface)?.into()) })
        .collect()
}
