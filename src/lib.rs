//! Whitted ray tracer
//!
//! Sphere, plane, cone and cylinder primitives under point lights, with Phong
//! shading, hard shadows and mirror reflection. Two backends share one
//! algorithm: a direct CPU evaluator, and a WGSL shader whose recursive
//! functions are unrolled into depth-indexed copies with the scene baked in
//! as literals.

#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ray;
pub mod interval;
pub mod hittable;
pub mod material;
pub mod light;
pub mod sphere;
pub mod plane;
pub mod cone;
pub mod cylinder;
pub mod primitive;
pub mod camera;
pub mod scene;
pub mod loader;
pub mod shading;
pub mod render;
pub mod transpile;
pub mod inject;
pub mod shader;
pub mod session;
