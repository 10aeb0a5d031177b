//! Whitted shading: Phong local illumination with hard shadows and recursive
//! mirror reflection.
//!
//! Depth counts up from 0. A reflection ray is only spawned while
//! `depth + 1 < max_depth`, which mirrors the depth blocks of the unrolled
//! shader: the last specialized copy simply has no reflection branch.

use crate::hittable::HitRecord;
use crate::interval::Interval;
use crate::material::Material;
use crate::primitive::Primitive;
use crate::ray::{normalize, reflect, Color, Ray};
use crate::scene::{Scene, SHADOW_EPSILON, T_MAX};

/// Returned for rays that escape the scene.
pub const BACKGROUND: Color = Color::ZERO;

/// Returned when a surface has no usable material, so the gap is visible.
pub const ERROR_COLOR: Color = Color::new(1.0, 0.0, 1.0);

/// Per-render state threaded through every shading call.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub max_depth: u32,
}

impl<'a> RenderContext<'a> {
    /// Context using the scene's own depth bound.
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            scene,
            max_depth: scene.max_depth,
        }
    }

    /// Color seen along a primary ray.
    pub fn trace(&self, ray: &Ray) -> Color {
        self.trace_depth(ray, 0)
    }

    /// Color seen along `ray` at reflection level `depth`.
    pub fn trace_depth(&self, ray: &Ray, depth: u32) -> Color {
        if depth >= self.max_depth {
            return BACKGROUND;
        }
        match self.scene.intersect(ray, Interval::new(SHADOW_EPSILON, T_MAX)) {
            Some((primitive, hit)) => self.shade(ray, primitive, &hit, depth),
            None => BACKGROUND,
        }
    }

    /// Local illumination at `hit` plus the reflected contribution.
    pub fn shade(&self, ray: &Ray, primitive: &Primitive, hit: &HitRecord, depth: u32) -> Color {
        let Some(material) = self.scene.material(hit.material) else {
            return ERROR_COLOR;
        };

        let mut result = self.local_color(ray, primitive, hit, material);

        if material.reflective_index > 0.0 && depth + 1 < self.max_depth {
            let bounce = mirror_ray(ray, hit);
            result += self.trace_depth(&bounce, depth + 1) * material.reflective_index;
        }

        result
    }

    /// Ambient term plus the diffuse and specular terms of every light that
    /// is not occluded.
    pub fn local_color(&self, ray: &Ray, primitive: &Primitive, hit: &HitRecord, material: &Material) -> Color {
        let scene = self.scene;
        let base = primitive.surface_color(hit.point, material.color);
        let mut result = base * material.ambient * scene.ambient.radiance();

        let view_dir = normalize(-ray.direction);

        for light in &scene.lights {
            let to_light = light.position - hit.point;
            let distance = to_light.length();
            let light_dir = normalize(to_light);

            if scene.occluded(hit.point, light_dir, distance) {
                continue;
            }

            let diffuse = base * material.diffuse * hit.normal.dot(light_dir).max(0.0);

            let reflect_dir = reflect(-light_dir, hit.normal);
            let cos_spec = view_dir.dot(reflect_dir);
            let specular = light.color * material.specular * phong_factor(cos_spec, material.specular_power);

            let attenuation = 1.0 / (distance * distance);
            result += (diffuse + specular) * light.color * light.intensity * attenuation;
        }

        result
    }

    /// Loop form of [`trace`](Self::trace): walks the mirror chain carrying
    /// the product of reflective indices instead of recursing.
    pub fn trace_iterative(&self, ray: &Ray) -> Color {
        let mut color = Color::ZERO;
        let mut weight = 1.0;
        let mut ray = *ray;

        for depth in 0..self.max_depth {
            let Some((primitive, hit)) = self.scene.intersect(&ray, Interval::new(SHADOW_EPSILON, T_MAX)) else {
                return color + BACKGROUND * weight;
            };
            let Some(material) = self.scene.material(hit.material) else {
                return color + ERROR_COLOR * weight;
            };

            color += self.local_color(&ray, primitive, &hit, material) * weight;

            if material.reflective_index > 0.0 && depth + 1 < self.max_depth {
                weight *= material.reflective_index;
                ray = mirror_ray(&ray, &hit);
            } else {
                return color;
            }
        }

        color + BACKGROUND * weight
    }
}

/// Phong highlight weight, `max(cos, 0)^power`. A zero exponent gives 1
/// even when the light reflects away from the viewer.
pub fn phong_factor(cos_spec: f32, power: f32) -> f32 {
    cos_spec.max(0.0).powf(power)
}

/// Reflected ray leaving the hit point.
pub fn mirror_ray(ray: &Ray, hit: &HitRecord) -> Ray {
    Ray::new(hit.point, normalize(reflect(ray.direction, hit.normal)))
}
