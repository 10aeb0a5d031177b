//! Ray-object intersection system.
//!
//! Defines the [`Hittable`] trait implemented by every primitive, the
//! transient [`HitRecord`] it produces, and the root-selection policy all
//! quadric primitives share.

use crate::interval::Interval;
use crate::material::MaterialId;
use crate::ray::{Ray, Vector3};

/// Ray-object intersection information.
///
/// Created per query and discarded by the caller once shaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Point where the ray intersects the object
    pub point: Vector3,
    /// Outward surface normal at the intersection point (unit vector)
    pub normal: Vector3,
    /// Material of the object that was hit
    pub material: MaterialId,
}

/// Trait for objects that can be intersected by rays.
///
/// Must be thread-safe (Sync + Send) so the scene can be shared with the
/// render workers.
pub trait Hittable: Sync + Send {
    /// Test for ray intersection within the given parameter range.
    ///
    /// Returns the nearest hit inside `ray_t`, or `None`.
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<HitRecord>;
}

/// Real roots of `a t² + b t + c = 0`, ordered so that the first is not
/// greater than the second.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();
    let t0 = (-b - sqrtd) / (2.0 * a);
    let t1 = (-b + sqrtd) / (2.0 * a);
    if t0 <= t1 {
        Some((t0, t1))
    } else {
        Some((t1, t0))
    }
}

/// Pick the smaller root if it lies in range and passes `accept`, else the
/// larger one under the same test.
pub fn nearest_root(
    (near, far): (f32, f32),
    ray_t: Interval,
    accept: impl Fn(f32) -> bool,
) -> Option<f32> {
    [near, far]
        .into_iter()
        .find(|&t| ray_t.contains(t) && accept(t))
}
