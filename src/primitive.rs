//! The closed set of scene primitives.

use crate::cone::Cone;
use crate::cylinder::Cylinder;
use crate::hittable::{HitRecord, Hittable};
use crate::interval::Interval;
use crate::material::MaterialId;
use crate::plane::Plane;
use crate::ray::{Color, Ray, Vector3};
use crate::sphere::Sphere;

/// Any geometric object a ray can hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Sphere(Sphere),
    Plane(Plane),
    Cone(Cone),
    Cylinder(Cylinder),
}

impl Primitive {
    /// Material index carried by the primitive.
    pub fn material(&self) -> MaterialId {
        match self {
            Primitive::Sphere(s) => s.material,
            Primitive::Plane(p) => p.material,
            Primitive::Cone(c) => c.material,
            Primitive::Cylinder(c) => c.material,
        }
    }

    /// Type tag used in scene descriptions.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Primitive::Sphere(_) => "sphere",
            Primitive::Plane(_) => "plane",
            Primitive::Cone(_) => "cone",
            Primitive::Cylinder(_) => "cylinder",
        }
    }

    /// Diffuse color at `point`, given the material color.
    pub fn surface_color(&self, point: Vector3, base: Color) -> Color {
        match self {
            Primitive::Plane(p) => p.surface_color(point, base),
            Primitive::Sphere(_) | Primitive::Cone(_) | Primitive::Cylinder(_) => base,
        }
    }
}

impl Hittable for Primitive {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord> {
        match self {
            Primitive::Sphere(s) => s.hit(r, ray_t),
            Primitive::Plane(p) => p.hit(r, ray_t),
            Primitive::Cone(c) => c.hit(r, ray_t),
            Primitive::Cylinder(c) => c.hit(r, ray_t),
        }
    }
}

impl From<Sphere> for Primitive {
    fn from(s: Sphere) -> Self {
        Primitive::Sphere(s)
    }
}

impl From<Plane> for Primitive {
    fn from(p: Plane) -> Self {
        Primitive::Plane(p)
    }
}

impl From<Cone> for Primitive {
    fn from(c: Cone) -> Self {
        Primitive::Cone(c)
    }
}

impl From<Cylinder> for Primitive {
    fn from(c: Cylinder) -> Self {
        Primitive::Cylinder(c)
    }
}
