//! Point lights and the global ambient term.

use crate::ray::{Color, Vector3};

/// Point light with inverse-square falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vector3,
    pub color: Color,
    /// Scalar multiplier, never negative after loading.
    pub intensity: f32,
}

/// Uniform light added to every surface regardless of occlusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl AmbientLight {
    /// Color scaled by intensity.
    pub fn radiance(&self) -> Color {
        self.color * self.intensity
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::ZERO,
            intensity: 0.0,
        }
    }
}
