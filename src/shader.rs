//! Shader backend: template, source assembly and the compiler seam.
//!
//! The WGSL template carries the recursive shading group and the scene
//! markers. [`build_shader_source`] runs it through the unroller and the scene
//! injector. A [`ShaderCompiler`] then turns the text into a program handle.

use std::time::Instant;

use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use thiserror::Error;

use crate::camera::Camera;
use crate::inject::inject_scene;
use crate::scene::Scene;
use crate::transpile::{RecursiveSource, TranspileError};

/// Whitted shader template with `rec:` and `scene:` markers.
pub const SHADER_TEMPLATE: &str = include_str!("../shaders/whitted.wgsl");

/// Fragment entry point of the generated module.
pub const ENTRY_POINT: &str = "fs_main";

/// Unroll the template to the scene's depth and inject the scene.
pub fn build_shader_source(scene: &Scene) -> Result<String, TranspileError> {
    build_from_template(SHADER_TEMPLATE, scene)
}

/// Same as [`build_shader_source`] for a caller-supplied template.
pub fn build_from_template(template: &str, scene: &Scene) -> Result<String, TranspileError> {
    let source = RecursiveSource::parse(template)?;
    let unrolled = source.unroll(scene.max_depth)?;
    let shader = inject_scene(&unrolled, scene)?;
    debug!(
        "Generated shader for '{}': {} marked functions x {} levels, {} bytes",
        scene.name,
        source.functions().len(),
        scene.max_depth,
        shader.len()
    );
    Ok(shader)
}

/// Diagnostic from the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shader compilation failed: {diagnostic}")]
pub struct CompileError {
    pub diagnostic: String,
}

impl CompileError {
    pub fn new(diagnostic: impl Into<String>) -> Self {
        Self {
            diagnostic: diagnostic.into(),
        }
    }
}

/// Opaque compile call for the restricted backend.
pub trait ShaderCompiler: Send + Sync + 'static {
    /// Handle to a compiled program.
    type Program: Send + Sync + 'static;

    fn compile(&self, source: &str) -> Result<Self::Program, CompileError>;
}

/// Validated naga module.
#[derive(Debug)]
pub struct CompiledShader {
    pub module: naga::Module,
    pub info: naga::valid::ModuleInfo,
}

impl CompiledShader {
    /// Whether the module exports the fragment entry point.
    pub fn has_entry_point(&self) -> bool {
        self.module
            .entry_points
            .iter()
            .any(|ep| ep.name == ENTRY_POINT && ep.stage == naga::ShaderStage::Fragment)
    }

    /// Number of functions after unrolling, entry points excluded.
    pub fn function_count(&self) -> usize {
        self.module.functions.len()
    }
}

/// WGSL front end plus full validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NagaCompiler;

impl ShaderCompiler for NagaCompiler {
    type Program = CompiledShader;

    fn compile(&self, source: &str) -> Result<CompiledShader, CompileError> {
        let start = Instant::now();
        let module = naga::front::wgsl::parse_str(source).map_err(|e| CompileError::new(error_chain(&e)))?;
        let info = Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .map_err(|e| CompileError::new(error_chain(&e)))?;
        info!("Shader compiled in {:.2?}", start.elapsed());
        Ok(CompiledShader { module, info })
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Per-frame inputs of the generated shader, `@group(0) @binding(0)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_origin: [f32; 4],
    pub camera_look_at: [f32; 4],
    pub resolution: [f32; 4],
}

impl FrameUniforms {
    pub fn new(camera: &Camera, width: u32, height: u32) -> Self {
        let origin = camera.origin();
        let look_at = camera.look_at();
        Self {
            camera_origin: [origin.x, origin.y, origin.z, 0.0],
            camera_look_at: [look_at.x, look_at.y, look_at.z, 0.0],
            resolution: [width as f32, height as f32, 0.0, 0.0],
        }
    }

    /// Bytes ready for a uniform buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_scene;
    use crate::ray::Vector3;

    const ALL_KINDS: &str = r#"{
        "camera": { "origin": [0, 1, 6], "lookAt": [0, 0.5, 0] },
        "materials": [
            { "type": "red", "color": [1, 0.1, 0.1], "ambient": 0.1, "diffuse": 0.8,
              "specular": 0.4, "specular_power": 24, "reflective_index": 0.3 },
            { "type": "floor", "color": [0.9, 0.9, 0.9], "ambient": 0.1, "diffuse": 0.9 }
        ],
        "objects": [
            { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "red" },
            { "type": "plane", "point": [0, -0.001, 0], "normal": [0, 1, 0],
              "checkerboard": true, "checker_size": 1, "material": "floor" },
            { "type": "cone", "apex": [2, 2, 0], "base": [2, 0.01, 0], "radius": 0.5, "material": "red" },
            { "type": "cylinder", "center1": [-2, 0.01, 0], "center2": [-2, 2, 0], "radius": 0.5, "material": "floor" }
        ],
        "lights": [
            { "origin": [-3, 4, 3], "color": [1, 1, 1], "intensity": 25 },
            { "origin": [3, 4, 3], "color": [0.5, 0.5, 1], "intensity": 15 }
        ],
        "ambient_light": { "color": [1, 1, 1], "intensity": 0.3 }
    }"#;

    fn compile(scene: &Scene) -> CompiledShader {
        let source = build_shader_source(scene).unwrap();
        match NagaCompiler.compile(&source) {
            Ok(program) => program,
            Err(err) => panic!("{err}\n---\n{source}"),
        }
    }

    #[test]
    fn template_parses() {
        let source = RecursiveSource::parse(SHADER_TEMPLATE).unwrap();
        let names: Vec<_> = source.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["trace", "shade", "reflection"]);
    }

    #[test]
    fn generated_source_compiles_for_each_depth() {
        let scene = parse_scene("all", ALL_KINDS).unwrap();
        let base_functions = compile(&scene.clone().with_max_depth(1)).function_count();
        for depth in [1, 2, 5, 8] {
            let program = compile(&scene.clone().with_max_depth(depth));
            assert!(program.has_entry_point());
            // three marked functions gain a copy per extra level
            assert_eq!(program.function_count(), base_functions + 3 * (depth as usize - 1));
        }
    }

    #[test]
    fn empty_scene_compiles() {
        let scene = Scene::new(Camera::new(Vector3::new(0.0, 0.0, 5.0), Vector3::ZERO));
        assert!(compile(&scene).has_entry_point());
    }

    #[test]
    fn broken_source_yields_diagnostic() {
        let err = NagaCompiler.compile("fn broken( {").unwrap_err();
        assert!(!err.diagnostic.is_empty());
    }

    #[test]
    fn recursion_is_rejected_by_the_compiler() {
        let err = NagaCompiler
            .compile("fn f(x: f32) -> f32 { return f(x); }")
            .unwrap_err();
        assert!(!err.diagnostic.is_empty());
    }

    #[test]
    fn uniforms_are_flat_floats() {
        let camera = Camera::new(Vector3::new(1.0, 2.0, 3.0), Vector3::ZERO);
        let uniforms = FrameUniforms::new(&camera, 640, 480);
        assert_eq!(uniforms.as_bytes().len(), 48);
        assert_eq!(uniforms.resolution, [640.0, 480.0, 0.0, 0.0]);
        assert_eq!(uniforms.camera_origin, [1.0, 2.0, 3.0, 0.0]);
    }
}
