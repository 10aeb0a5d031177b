//! Pinhole camera for primary ray generation.
//!
//! The basis is resolved against a fixed world-up of (0, 1, 0). When the view
//! direction is parallel to world-up the cross product vanishes, `right` and
//! `up` collapse to zero and every primary ray points straight along
//! `forward`. This singularity is left as is; callers that orbit the camera
//! should keep the look direction off the vertical.

use glam::Vec3A;

use crate::ray::{normalize, Ray, Vector3};

/// Fixed reference used to resolve `right` and `up`.
pub const WORLD_UP: Vector3 = Vec3A::Y;

/// Vertical field of view in degrees.
pub const FIELD_OF_VIEW: f32 = 45.0;

/// Pinhole camera.
///
/// Owned by the caller across frames; the scene only stores the initial pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    origin: Vector3,
    look_at: Vector3,
    /// Unit view direction
    forward: Vector3,
    /// Camera frame basis vector pointing right
    right: Vector3,
    /// Camera frame basis vector pointing up
    up: Vector3,
}

impl Camera {
    /// Creates a camera at `origin` looking at `look_at`.
    pub fn new(origin: Vector3, look_at: Vector3) -> Self {
        let mut camera = Self {
            origin,
            look_at,
            forward: Vector3::ZERO,
            right: Vector3::ZERO,
            up: Vector3::ZERO,
        };
        camera.update_basis();
        camera
    }

    pub fn origin(&self) -> Vector3 {
        self.origin
    }

    pub fn look_at(&self) -> Vector3 {
        self.look_at
    }

    /// Returns (forward, right, up).
    pub fn basis(&self) -> (Vector3, Vector3, Vector3) {
        (self.forward, self.right, self.up)
    }

    /// Move the camera, keeping the look-at target.
    pub fn set_origin(&mut self, origin: Vector3) {
        self.origin = origin;
        self.update_basis();
    }

    /// Aim the camera at a new target.
    pub fn set_look_at(&mut self, look_at: Vector3) {
        self.look_at = look_at;
        self.update_basis();
    }

    fn update_basis(&mut self) {
        self.forward = normalize(self.look_at - self.origin);
        self.right = normalize(self.forward.cross(WORLD_UP));
        self.up = self.right.cross(self.forward);
    }

    /// Ray through the image-plane position (`px`, `py`), measured in pixels
    /// from the top-left corner. Pixel centers sit at half-integers.
    pub fn primary_ray(&self, px: f32, py: f32, width: u32, height: u32) -> Ray {
        let aspect = width as f32 / height as f32;
        let half_height = (FIELD_OF_VIEW.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;

        let u = px / width as f32;
        let v = py / height as f32;

        let direction = self.forward
            + self.right * ((2.0 * u - 1.0) * half_width)
            + self.up * ((1.0 - 2.0 * v) * half_height);

        Ray::new(self.origin, normalize(direction))
    }
}
