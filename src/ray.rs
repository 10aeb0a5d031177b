//! Ray representation and the small vector helpers shared by both backends.
//!
//! A ray is defined as r(t) = origin + t * direction.

use glam::Vec3A;

/// Position or direction in world space.
pub type Vector3 = Vec3A;

/// Linear RGB color.
pub type Color = Vec3A;

/// Ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Starting point of the ray in world coordinates.
    pub origin: Vector3,

    /// Direction of the ray.
    ///
    /// Not required to be unit length by the intersection code, but every
    /// ray built by the camera and the shading engine is normalized.
    pub direction: Vector3,
}

impl Ray {
    /// Create a new ray with origin and direction.
    pub fn new(origin: Vector3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// Compute the point at parameter t along the ray.
    pub fn at(&self, t: f32) -> Vector3 {
        self.origin + t * self.direction
    }
}

/// Normalize `v`, mapping the zero vector to itself.
pub fn normalize(v: Vector3) -> Vector3 {
    v.normalize_or_zero()
}

/// Mirror `v` about the plane with unit normal `n`.
///
/// Same convention as WGSL `reflect(e1, e2)`: `v - 2 (v·n) n`.
pub fn reflect(v: Vector3, n: Vector3) -> Vector3 {
    v - 2.0 * v.dot(n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(normalize(Vector3::ZERO), Vector3::ZERO);
        let n = normalize(Vector3::new(3.0, 0.0, 4.0));
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn reflect_flips_normal_component() {
        let r = reflect(Vector3::new(1.0, -1.0, 0.0), Vector3::Y);
        assert_eq!(r, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn at_walks_along_direction() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.at(4.0), Vector3::new(0.0, 0.0, 1.0));
    }
}
