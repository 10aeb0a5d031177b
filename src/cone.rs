//! Finite cone between an apex and a circular base.
//!
//! The quadratic is the classic half-angle form: with `v` the unit axis and
//! `oc` the ray origin relative to the apex,
//!
//! ```text
//! a = (d·v)² - cos²θ (d·d)
//! b = 2 ((d·v)(oc·v) - cos²θ (d·oc))
//! c = (oc·v)² - cos²θ (oc·oc)
//! ```
//!
//! Roots on the mirrored nappe or past the base are rejected by the axial
//! projection check.

use crate::hittable::{nearest_root, solve_quadratic, HitRecord, Hittable};
use crate::interval::Interval;
use crate::material::MaterialId;
use crate::ray::{normalize, Ray, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    /// Tip of the cone.
    pub apex: Vector3,
    /// Center of the base disc.
    pub base: Vector3,
    /// Radius of the base disc.
    pub radius: f32,
    pub material: MaterialId,
}

impl Cone {
    pub fn new(apex: Vector3, base: Vector3, radius: f32, material: MaterialId) -> Self {
        Self {
            apex,
            base,
            radius,
            material,
        }
    }

    fn axis(&self) -> (Vector3, f32) {
        let axis = self.base - self.apex;
        (normalize(axis), axis.length())
    }
}

impl Hittable for Cone {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let (axis_dir, axis_length) = self.axis();
        let length_sq = axis_length * axis_length;
        let cos2 = length_sq / (length_sq + self.radius * self.radius);

        let oc = r.origin - self.apex;
        let dv = r.direction.dot(axis_dir);
        let ov = oc.dot(axis_dir);

        let a = dv * dv - cos2 * r.direction.dot(r.direction);
        let b = 2.0 * (dv * ov - cos2 * r.direction.dot(oc));
        let c = ov * ov - cos2 * oc.dot(oc);

        let roots = solve_quadratic(a, b, c)?;
        let t = nearest_root(roots, ray_t, |t| {
            let projection = (r.at(t) - self.apex).dot(axis_dir);
            (0.0..=axis_length).contains(&projection)
        })?;

        let point = r.at(t);
        let to_point = point - self.apex;
        let perp = to_point - axis_dir * to_point.dot(axis_dir);
        let normal = normalize(normalize(perp) - axis_dir * (self.radius / axis_length));

        Some(HitRecord {
            t,
            point,
            normal,
            material: self.material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Apex at y = 2, base disc of radius 1 on y = 0.
    fn upright() -> Cone {
        Cone::new(Vector3::new(0.0, 2.0, 0.0), Vector3::ZERO, 1.0, MaterialId(0))
    }

    #[test]
    fn side_hit_at_half_height() {
        let ray = Ray::new(Vector3::new(0.0, 1.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let rec = upright().hit(&ray, Interval::new(0.001, f32::MAX)).unwrap();
        // radius is 0.5 at half height
        assert!((rec.t - 4.5).abs() < 1e-4);
        assert!((rec.normal.length() - 1.0).abs() < 1e-5);
        assert!(rec.normal.z > 0.0);
        assert!(rec.normal.y > 0.0);
    }

    #[test]
    fn mirrored_nappe_is_rejected() {
        // above the apex the infinite double cone would still be hit
        let ray = Ray::new(Vector3::new(0.0, 3.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(upright().hit(&ray, Interval::new(0.001, f32::MAX)).is_none());
    }

    #[test]
    fn below_base_is_rejected() {
        let ray = Ray::new(Vector3::new(0.0, -0.5, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(upright().hit(&ray, Interval::new(0.001, f32::MAX)).is_none());
    }

    #[test]
    fn hit_point_lies_on_surface() {
        let cone = upright();
        let ray = Ray::new(Vector3::new(3.0, 0.7, 4.0), normalize(Vector3::new(-3.0, 0.2, -4.0)));
        let rec = cone.hit(&ray, Interval::new(0.001, f32::MAX)).unwrap();
        let (axis_dir, axis_length) = cone.axis();
        let h = (rec.point - cone.apex).dot(axis_dir);
        let radial = (rec.point - cone.apex - axis_dir * h).length();
        assert!((radial - h * cone.radius / axis_length).abs() < 1e-3);
    }
}
