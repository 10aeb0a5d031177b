//! Sphere primitive.

use crate::hittable::{nearest_root, solve_quadratic, HitRecord, Hittable};
use crate::interval::Interval;
use crate::material::MaterialId;
use crate::ray::{Ray, Vector3};

/// Sphere primitive defined by center, radius, and material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center point of the sphere in world coordinates.
    pub center: Vector3,
    /// Radius of the sphere, positive once validated by the loader.
    pub radius: f32,
    /// Material index of the surface.
    pub material: MaterialId,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vector3, radius: f32, material: MaterialId) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }
}

impl Hittable for Sphere {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord> {
        // Vector from sphere center to ray origin
        let oc = r.origin - self.center;

        let a = r.direction.dot(r.direction);
        let b = 2.0 * oc.dot(r.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        let roots = solve_quadratic(a, b, c)?;
        let t = nearest_root(roots, ray_t, |_| true)?;

        let point = r.at(t);
        Some(HitRecord {
            t,
            point,
            normal: (point - self.center) / self.radius,
            material: self.material,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_sphere() -> Sphere {
        Sphere::new(Vector3::ZERO, 1.0, MaterialId(0))
    }

    #[test]
    fn head_on_hit() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let rec = unit_sphere().hit(&ray, Interval::new(0.001, f32::MAX)).unwrap();
        assert!((rec.t - 4.0).abs() < 1e-6);
        assert!((rec.point - Vector3::new(0.0, 0.0, 1.0)).length() < 1e-6);
        assert!((rec.normal - Vector3::new(0.0, 0.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn inside_origin_uses_far_root() {
        let ray = Ray::new(Vector3::ZERO, Vector3::X);
        let rec = unit_sphere().hit(&ray, Interval::new(0.001, f32::MAX)).unwrap();
        assert!((rec.t - 1.0).abs() < 1e-6);
    }

    #[test]
    fn miss_and_out_of_range() {
        let sphere = unit_sphere();
        let miss = Ray::new(Vector3::new(0.0, 2.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(sphere.hit(&miss, Interval::new(0.001, f32::MAX)).is_none());

        let short = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(sphere.hit(&short, Interval::new(0.001, 3.0)).is_none());
    }

    #[test]
    fn normals_are_unit_and_outward() {
        let sphere = Sphere::new(Vector3::new(1.0, -2.0, 0.5), 1.5, MaterialId(0));
        for i in 0..32 {
            let angle = i as f32 * 0.19;
            let origin = Vector3::new(6.0 * angle.cos(), 1.0 + angle.sin(), 6.0 * angle.sin());
            let direction = (sphere.center + Vector3::new(0.3, 0.2, -0.1) - origin).normalize();
            let rec = sphere
                .hit(&Ray::new(origin, direction), Interval::new(0.001, f32::MAX))
                .unwrap();
            assert!((rec.normal.length() - 1.0).abs() < 1e-4);
            assert!(rec.normal.dot(rec.point - sphere.center) > 0.0);
            // smallest root: the point satisfies |p - c| = r
            assert!(((rec.point - sphere.center).length() - sphere.radius).abs() < 1e-3);
        }
    }
}
