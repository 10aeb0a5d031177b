//! Immutable scene snapshot and its ray queries.

use crate::camera::Camera;
use crate::hittable::{HitRecord, Hittable};
use crate::interval::Interval;
use crate::light::{AmbientLight, Light};
use crate::material::{Material, MaterialId, MaterialTable};
use crate::primitive::Primitive;
use crate::ray::{Ray, Vector3};

/// Recursion bound used when a description does not set one.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Lower bound of every ray query, keeps surfaces from shadowing themselves.
pub const SHADOW_EPSILON: f32 = 0.001;

/// Upper bound of primary and reflected ray queries.
pub const T_MAX: f32 = 1.0e30;

/// Everything a render pass reads. Built once by the loader, then shared
/// read-only between workers and the transpiler.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Display name, usually the file stem.
    pub name: String,
    /// Initial camera pose from the description.
    pub camera: Camera,
    pub primitives: Vec<Primitive>,
    pub lights: Vec<Light>,
    pub materials: MaterialTable,
    pub ambient: AmbientLight,
    /// Reflection bound shared by the direct evaluator and the unrolled
    /// shader. Always at least 1.
    pub max_depth: u32,
}

impl Scene {
    /// Empty scene viewed through `camera`.
    pub fn new(camera: Camera) -> Self {
        Self {
            name: String::new(),
            camera,
            primitives: Vec::new(),
            lights: Vec::new(),
            materials: MaterialTable::default(),
            ambient: AmbientLight::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Same scene with a different reflection bound, clamped to at least 1.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    /// Nearest primitive along `ray` inside `ray_t`.
    ///
    /// Scans linearly; every hit tightens the upper bound for the primitives
    /// after it.
    pub fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<(&Primitive, HitRecord)> {
        let mut closest_so_far = ray_t.max;
        let mut nearest = None;

        for primitive in &self.primitives {
            if let Some(rec) = primitive.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = rec.t;
                nearest = Some((primitive, rec));
            }
        }

        nearest
    }

    /// True when anything lies between `point` and `point + direction * distance`.
    ///
    /// `direction` must be unit length.
    pub fn occluded(&self, point: Vector3, direction: Vector3, distance: f32) -> bool {
        let shadow_ray = Ray::new(point, direction);
        self.intersect(&shadow_ray, Interval::new(SHADOW_EPSILON, distance))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sphere::Sphere;

    fn two_spheres() -> Scene {
        let mut scene = Scene::new(Camera::new(Vector3::new(0.0, 0.0, 10.0), Vector3::ZERO));
        scene.primitives.push(Sphere::new(Vector3::new(0.0, 0.0, -5.0), 1.0, MaterialId(0)).into());
        scene.primitives.push(Sphere::new(Vector3::ZERO, 1.0, MaterialId(1)).into());
        scene
    }

    #[test]
    fn nearest_hit_wins_regardless_of_order() {
        let scene = two_spheres();
        let ray = Ray::new(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let (primitive, rec) = scene.intersect(&ray, Interval::new(SHADOW_EPSILON, T_MAX)).unwrap();
        assert_eq!(primitive.material(), MaterialId(1));
        assert!((rec.t - 9.0).abs() < 1e-5);
    }

    #[test]
    fn empty_segment_is_never_shadowed() {
        let scene = two_spheres();
        let up = Vector3::Y;
        for distance in [0.01, 1.0, 1.0e3, T_MAX] {
            assert!(!scene.occluded(Vector3::new(0.0, 2.0, 0.0), up, distance));
        }
    }

    #[test]
    fn blocker_inside_segment_shadows() {
        let scene = two_spheres();
        let toward = Vector3::new(0.0, 0.0, -1.0);
        assert!(scene.occluded(Vector3::new(0.0, 0.0, 3.0), toward, 10.0));
        // light sits before the blocker
        assert!(!scene.occluded(Vector3::new(0.0, 0.0, 3.0), toward, 1.5));
    }
}
