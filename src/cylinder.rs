//! Finite open cylinder between two cap centers.

use crate::hittable::{nearest_root, solve_quadratic, HitRecord, Hittable};
use crate::interval::Interval;
use crate::material::MaterialId;
use crate::ray::{normalize, Ray, Vector3};

/// Below this |a| the ray runs along the axis and never meets the side.
pub const AXIS_EPSILON: f32 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub center1: Vector3,
    pub center2: Vector3,
    pub radius: f32,
    pub material: MaterialId,
}

impl Cylinder {
    pub fn new(center1: Vector3, center2: Vector3, radius: f32, material: MaterialId) -> Self {
        Self {
            center1,
            center2,
            radius,
            material,
        }
    }
}

impl Hittable for Cylinder {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let axis = self.center2 - self.center1;
        let axis_length = axis.length();
        if axis_length < AXIS_EPSILON {
            return None;
        }
        let axis_dir = axis / axis_length;

        // components perpendicular to the axis
        let oc = r.origin - self.center1;
        let d_perp = r.direction - axis_dir * r.direction.dot(axis_dir);
        let oc_perp = oc - axis_dir * oc.dot(axis_dir);

        let a = d_perp.dot(d_perp);
        if a.abs() < AXIS_EPSILON {
            return None;
        }
        let b = 2.0 * d_perp.dot(oc_perp);
        let c = oc_perp.dot(oc_perp) - self.radius * self.radius;

        let roots = solve_quadratic(a, b, c)?;
        let t = nearest_root(roots, ray_t, |t| {
            let projection = (r.at(t) - self.center1).dot(axis_dir);
            (0.0..=axis_length).contains(&projection)
        })?;

        let point = r.at(t);
        let axis_point = self.center1 + axis_dir * (point - self.center1).dot(axis_dir);
        Some(HitRecord {
            t,
            point,
            normal: normalize(point - axis_point),
            material: self.material,
        })
    }
}
