//! Direct-execution backend: parallel per-pixel rendering.

use std::time::Instant;

use image::{ImageBuffer, Rgb};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;

use crate::camera::Camera;
use crate::ray::Color;
use crate::scene::Scene;
use crate::shading::RenderContext;

/// Linear HDR image produced by a render.
pub type Frame = ImageBuffer<Rgb<f32>, Vec<f32>>;

/// Knobs for a single render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Edge of the square block sharing one sample. 1 renders every pixel.
    pub block_size: u32,
    pub show_progress: bool,
    /// Use the loop evaluator instead of the recursive one.
    pub iterative: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            block_size: 1,
            show_progress: false,
            iterative: false,
        }
    }
}

impl RenderSettings {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

/// Renders `scene` through `camera`.
///
/// Each block of `block_size`² pixels is traced once, through the center of
/// its top-left pixel, and the sample is replicated over the block. Blocks
/// are traced on the rayon pool and the image is assembled after all of them
/// finish.
pub fn render(scene: &Scene, camera: &Camera, settings: &RenderSettings) -> Frame {
    let RenderSettings { width, height, .. } = *settings;
    let block = settings.block_size.max(1);
    let mut frame = Frame::new(width, height);
    if width == 0 || height == 0 {
        return frame;
    }

    let blocks_x = width.div_ceil(block);
    let blocks_y = height.div_ceil(block);
    let ctx = RenderContext::new(scene);

    info!(
        "Rendering {}x{} (block {}) with {} threads...",
        width,
        height,
        block,
        rayon::current_num_threads()
    );
    let start = Instant::now();

    let pb = if settings.show_progress {
        ProgressBar::new(u64::from(blocks_x) * u64::from(blocks_y))
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template("{bar:40} {pos}/{len} ETA: {eta}") {
        pb.set_style(style);
    }

    let samples: Vec<Color> = (0..blocks_x * blocks_y)
        .into_par_iter()
        .map(|index| {
            let bx = index % blocks_x;
            let by = index / blocks_x;
            let ray = camera.primary_ray(
                (bx * block) as f32 + 0.5,
                (by * block) as f32 + 0.5,
                width,
                height,
            );
            let color = if settings.iterative {
                ctx.trace_iterative(&ray)
            } else {
                ctx.trace(&ray)
            };
            pb.inc(1);
            color
        })
        .collect();

    pb.finish_and_clear();

    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let c = samples[((y / block) * blocks_x + x / block) as usize];
        *pixel = Rgb([c.x, c.y, c.z]);
    }

    info!("Image rendered in {:.2?}", start.elapsed());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::AmbientLight;
    use crate::material::Material;
    use crate::ray::Vector3;
    use crate::shading::BACKGROUND;
    use crate::sphere::Sphere;

    fn sphere_scene() -> Scene {
        let mut scene = Scene::new(Camera::new(Vector3::new(0.0, 0.0, 5.0), Vector3::ZERO));
        let white = scene
            .materials
            .insert(
                "white",
                Material {
                    ambient: 1.0,
                    ..Material::default()
                },
            )
            .unwrap();
        scene.primitives.push(Sphere::new(Vector3::ZERO, 1.0, white).into());
        scene.ambient = AmbientLight {
            color: Color::ONE,
            intensity: 1.0,
        };
        scene
    }

    #[test]
    fn center_hits_corner_misses() {
        let scene = sphere_scene();
        let frame = render(&scene, &scene.camera, &RenderSettings::with_size(32, 32));
        assert_eq!(frame.dimensions(), (32, 32));
        assert_eq!(frame.get_pixel(16, 16).0, [1.0, 1.0, 1.0]);
        assert_eq!(frame.get_pixel(0, 0).0, [BACKGROUND.x, BACKGROUND.y, BACKGROUND.z]);
    }

    #[test]
    fn blocks_replicate_their_sample() {
        let scene = sphere_scene();
        let settings = RenderSettings {
            block_size: 4,
            ..RenderSettings::with_size(30, 22)
        };
        let frame = render(&scene, &scene.camera, &settings);
        assert_eq!(frame.dimensions(), (30, 22));
        for (x, y, pixel) in frame.enumerate_pixels() {
            let anchor = frame.get_pixel(x - x % 4, y - y % 4);
            assert_eq!(pixel, anchor);
        }
    }

    #[test]
    fn iterative_and_recursive_frames_agree() {
        let scene = sphere_scene();
        let recursive = render(&scene, &scene.camera, &RenderSettings::with_size(24, 16));
        let iterative = render(
            &scene,
            &scene.camera,
            &RenderSettings {
                iterative: true,
                ..RenderSettings::with_size(24, 16)
            },
        );
        for (a, b) in recursive.pixels().zip(iterative.pixels()) {
            for c in 0..3 {
                assert!((a[c] - b[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn empty_frame_is_allowed() {
        let scene = sphere_scene();
        let frame = render(&scene, &scene.camera, &RenderSettings::with_size(0, 10));
        assert_eq!(frame.dimensions(), (0, 10));
    }
}
