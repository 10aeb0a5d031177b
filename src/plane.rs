//! Infinite plane with an optional procedural checkerboard.

use crate::hittable::{HitRecord, Hittable};
use crate::interval::Interval;
use crate::material::MaterialId;
use crate::ray::{Color, Ray, Vector3};

/// Below this |dir·normal| the ray is treated as parallel to the plane.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Color of the even checkerboard cells.
pub const CHECKER_DARK: Color = Color::new(0.1, 0.1, 0.1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Any point on the plane.
    pub point: Vector3,
    /// Unit normal.
    pub normal: Vector3,
    /// Cell edge length when the checkerboard is enabled.
    pub checker_size: Option<f32>,
    pub material: MaterialId,
}

impl Plane {
    /// Create a plane. `normal` is normalized here.
    pub fn new(point: Vector3, normal: Vector3, checker_size: Option<f32>, material: MaterialId) -> Self {
        Self {
            point,
            normal: crate::ray::normalize(normal),
            checker_size,
            material,
        }
    }

    /// Material color, or the dark cell color on even checker parity.
    pub fn surface_color(&self, point: Vector3, base: Color) -> Color {
        match self.checker_size {
            Some(size) if checker_parity(point, size) == 0 => CHECKER_DARK,
            _ => base,
        }
    }
}

/// Parity of floor(x/size) + floor(z/size).
fn checker_parity(point: Vector3, size: f32) -> i64 {
    let cell = (point.x / size).floor() as i64 + (point.z / size).floor() as i64;
    cell.rem_euclid(2)
}

impl Hittable for Plane {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let denom = r.direction.dot(self.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (self.point - r.origin).dot(self.normal) / denom;
        if !ray_t.contains(t) {
            return None;
        }
        Some(HitRecord {
            t,
            point: r.at(t),
            normal: self.normal,
            material: self.material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(checker: Option<f32>) -> Plane {
        Plane::new(Vector3::ZERO, Vector3::Y, checker, MaterialId(0))
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(Vector3::new(0.0, 1.0, 0.0), Vector3::X);
        assert!(ground(None).hit(&ray, Interval::new(0.001, f32::MAX)).is_none());
    }

    #[test]
    fn hit_from_above_and_below() {
        let down = Ray::new(Vector3::new(0.5, 2.0, 0.5), -Vector3::Y);
        let rec = ground(None).hit(&down, Interval::new(0.001, f32::MAX)).unwrap();
        assert!((rec.t - 2.0).abs() < 1e-6);
        assert_eq!(rec.normal, Vector3::Y);

        let up = Ray::new(Vector3::new(0.0, -3.0, 0.0), Vector3::Y);
        let rec = ground(None).hit(&up, Interval::new(0.001, f32::MAX)).unwrap();
        assert!((rec.t - 3.0).abs() < 1e-6);
    }

    #[test]
    fn behind_origin_is_rejected() {
        let away = Ray::new(Vector3::new(0.0, 2.0, 0.0), Vector3::Y);
        assert!(ground(None).hit(&away, Interval::new(0.001, f32::MAX)).is_none());
    }

    #[test]
    fn checkerboard_alternates() {
        let plane = ground(Some(1.0));
        let base = Color::new(1.0, 0.0, 0.0);
        assert_eq!(plane.surface_color(Vector3::new(0.5, 0.0, 0.5), base), CHECKER_DARK);
        assert_eq!(plane.surface_color(Vector3::new(1.5, 0.0, 0.5), base), base);
        assert_eq!(plane.surface_color(Vector3::new(-0.5, 0.0, 0.5), base), base);
        assert_eq!(plane.surface_color(Vector3::new(-0.5, 0.0, -0.5), base), CHECKER_DARK);
        assert_eq!(ground(None).surface_color(Vector3::new(0.5, 0.0, 0.5), base), base);
    }
}
