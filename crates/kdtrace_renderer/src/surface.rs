//! Surface descriptions attached to shapes.

use kdtrace_math::Vec3;
use serde::{Deserialize, Serialize};

/// RGB color, nominally in [0, 1] per channel.
///
/// Channels may exceed 1.0 during shading; the final 8-bit conversion
/// rescales proportionally.
pub type Color = Vec3;

/// How a shape responds to light.
///
/// A surface may be reflective, refractive (it has an index of refraction)
/// or both, which models glass. A surface that is neither is shaded as a
/// diffuse surface lit by the point light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub color: Color,
    pub reflective: bool,
    pub index_of_refraction: Option<f64>,
}

impl Surface {
    pub fn diffuse(color: Color) -> Self {
        Self {
            color,
            reflective: false,
            index_of_refraction: None,
        }
    }

    pub fn mirror(color: Color) -> Self {
        Self {
            color,
            reflective: true,
            index_of_refraction: None,
        }
    }

    /// Transmits light only, bending it by `ior`.
    pub fn refractive(color: Color, ior: f64) -> Self {
        Self {
            color,
            reflective: false,
            index_of_refraction: Some(ior),
        }
    }

    /// Reflective and refractive; the split is weighted by Fresnel.
    pub fn glass(color: Color, ior: f64) -> Self {
        Self {
            color,
            reflective: true,
            index_of_refraction: Some(ior),
        }
    }

    pub fn is_refractive(&self) -> bool {
        self.index_of_refraction.is_some()
    }
}

impl Default for Surface {
    fn default() -> Self {
        Surface::diffuse(Color::splat(0.8))
    }
}
