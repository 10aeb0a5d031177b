//! # Output Module
//!
//! Writes rendered frames to disk:
//! - PNG: values clamped to [0, 1] and scaled to 8 bits, no gamma curve, so
//!   the file matches what the shader writes to its color target
//! - EXR: linear HDR values, untouched
//!
//! Write failures are logged and never abort the process.

use std::path::Path;

use exr::prelude::write_rgb_file;
use image::{ImageBuffer, Rgb};
use log::{info, warn};
use whitted::render::Frame;

/// File formats the renderer can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Exr,
}

impl OutputFormat {
    /// Format implied by the file extension, case-insensitive.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(Self::Png),
            "exr" => Some(Self::Exr),
            _ => None,
        }
    }
}

/// Save `frame` in `format`.
pub fn save_frame(frame: &Frame, path: &Path, format: OutputFormat) {
    match format {
        OutputFormat::Png => save_image_as_png(frame, path),
        OutputFormat::Exr => save_image_as_exr(frame, path),
    }
}

fn to_ldr(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Save an f32 RGB frame as an 8-bit PNG.
pub fn save_image_as_png(frame: &Frame, path: &Path) {
    let (width, height) = frame.dimensions();
    let ldr: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        let pixel = frame.get_pixel(x, y);
        Rgb([to_ldr(pixel[0]), to_ldr(pixel[1]), to_ldr(pixel[2])])
    });

    match ldr.save(path) {
        Ok(_) => info!("Image saved as {}", path.display()),
        Err(e) => warn!("Failed to save image: {}", e),
    }
}

/// Save an f32 RGB frame as EXR with full HDR precision.
pub fn save_image_as_exr(frame: &Frame, path: &Path) {
    let (width, height) = frame.dimensions();
    let result = write_rgb_file(path, width as usize, height as usize, |x, y| {
        let pixel = frame.get_pixel(x as u32, y as u32);
        (pixel[0], pixel[1], pixel[2])
    });

    match result {
        Ok(_) => info!("HDR image saved as EXR: {}", path.display()),
        Err(e) => warn!("Failed to save EXR image: {}", e),
    }
}
