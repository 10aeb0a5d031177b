//! Scene-data injection.
//!
//! WGSL has no way to receive the variable-length scene at draw time besides
//! storage buffers, which the fragment path does not use. Instead every entity
//! is written into the shader as a literal constructor over `vec4<f32>` rows:
//!
//! | entity    | rows                                                             |
//! |-----------|------------------------------------------------------------------|
//! | Primitive | `(kind, material, radius, checker size or 0)`, `(a, 0)`, `(b, 0)` |
//! | Material  | `(color, ambient)`, `(diffuse, specular, power, reflective)`     |
//! | Light     | `(position, intensity)`, `(color, 0)`                            |
//!
//! The packed rows exist only at this boundary; everything on the Rust side
//! works with [`Primitive`] and friends.

use std::fmt::Write as _;

use crate::cone::Cone;
use crate::cylinder::Cylinder;
use crate::light::{AmbientLight, Light};
use crate::material::{Material, MaterialId};
use crate::plane::Plane;
use crate::primitive::Primitive;
use crate::ray::{Color, Vector3};
use crate::scene::Scene;
use crate::sphere::Sphere;
use crate::transpile::TranspileError;

/// One `vec4<f32>` row.
pub type Row = [f32; 4];

/// Primitive kind codes understood by the shader.
pub const KIND_SPHERE: f32 = 1.0;
pub const KIND_PLANE: f32 = 2.0;
pub const KIND_CONE: f32 = 3.0;
pub const KIND_CYLINDER: f32 = 4.0;

/// Marker replaced by counts and array declarations.
pub const DECLARATIONS_MARKER: &str = "// scene:declarations";
/// Marker replaced by per-entity assignments.
pub const CONSTRUCTORS_MARKER: &str = "// scene:constructors";

/// Something that can be written into the shader as a literal.
pub trait ShaderLiteral: Sized {
    /// WGSL struct name.
    const STRUCT: &'static str;

    /// Packed attribute rows.
    fn packed(&self) -> Vec<Row>;

    /// Inverse of [`packed`](Self::packed).
    fn from_packed(rows: &[Row]) -> Option<Self>;

    /// Constructor expression, e.g. `Light(vec4<f32>(..), vec4<f32>(..))`.
    fn literal(&self) -> String {
        let rows: Vec<String> = self.packed().iter().map(vec4_literal).collect();
        format!("{}({})", Self::STRUCT, rows.join(", "))
    }
}

fn xyz(row: &Row) -> Vector3 {
    Vector3::new(row[0], row[1], row[2])
}

fn with_w(v: Vector3, w: f32) -> Row {
    [v.x, v.y, v.z, w]
}

impl ShaderLiteral for Primitive {
    const STRUCT: &'static str = "Primitive";

    fn packed(&self) -> Vec<Row> {
        let material = self.material().0 as f32;
        let (header, a, b) = match self {
            Primitive::Sphere(s) => ([KIND_SPHERE, material, s.radius, 0.0], s.center, Vector3::ZERO),
            Primitive::Plane(p) => (
                [KIND_PLANE, material, 0.0, p.checker_size.unwrap_or(0.0)],
                p.point,
                p.normal,
            ),
            Primitive::Cone(c) => ([KIND_CONE, material, c.radius, 0.0], c.apex, c.base),
            Primitive::Cylinder(c) => ([KIND_CYLINDER, material, c.radius, 0.0], c.center1, c.center2),
        };
        vec![header, with_w(a, 0.0), with_w(b, 0.0)]
    }

    fn from_packed(rows: &[Row]) -> Option<Self> {
        let [header, a, b] = rows else {
            return None;
        };
        let material = MaterialId(header[1] as u32);
        let (radius, a, b) = (header[2], xyz(a), xyz(b));
        let primitive = if header[0] == KIND_SPHERE {
            Sphere::new(a, radius, material).into()
        } else if header[0] == KIND_PLANE {
            let checker = (header[3] > 0.0).then_some(header[3]);
            Primitive::Plane(Plane {
                point: a,
                normal: b,
                checker_size: checker,
                material,
            })
        } else if header[0] == KIND_CONE {
            Cone::new(a, b, radius, material).into()
        } else if header[0] == KIND_CYLINDER {
            Cylinder::new(a, b, radius, material).into()
        } else {
            return None;
        };
        Some(primitive)
    }
}

impl ShaderLiteral for Material {
    const STRUCT: &'static str = "Material";

    fn packed(&self) -> Vec<Row> {
        vec![
            with_w(self.color, self.ambient),
            [self.diffuse, self.specular, self.specular_power, self.reflective_index],
        ]
    }

    fn from_packed(rows: &[Row]) -> Option<Self> {
        let [color, coefficients] = rows else {
            return None;
        };
        Some(Material {
            color: xyz(color),
            ambient: color[3],
            diffuse: coefficients[0],
            specular: coefficients[1],
            specular_power: coefficients[2],
            reflective_index: coefficients[3],
        })
    }
}

impl ShaderLiteral for Light {
    const STRUCT: &'static str = "Light";

    fn packed(&self) -> Vec<Row> {
        vec![with_w(self.position, self.intensity), with_w(self.color, 0.0)]
    }

    fn from_packed(rows: &[Row]) -> Option<Self> {
        let [position, color] = rows else {
            return None;
        };
        Some(Light {
            position: xyz(position),
            color: xyz(color),
            intensity: position[3],
        })
    }
}

impl ShaderLiteral for AmbientLight {
    const STRUCT: &'static str = "vec4<f32>";

    fn packed(&self) -> Vec<Row> {
        vec![with_w(self.color, self.intensity)]
    }

    fn from_packed(rows: &[Row]) -> Option<Self> {
        let [row] = rows else {
            return None;
        };
        Some(AmbientLight {
            color: Color::new(row[0], row[1], row[2]),
            intensity: row[3],
        })
    }

    fn literal(&self) -> String {
        vec4_literal(&self.packed()[0])
    }
}

/// WGSL float literal that reads back to the same `f32`.
pub fn float_literal(value: f32) -> String {
    // Debug prints the shortest round-tripping form and always keeps a `.`
    // or an exponent, both valid WGSL.
    format!("{value:?}")
}

fn vec4_literal(row: &Row) -> String {
    let parts: Vec<String> = row.iter().map(|&v| float_literal(v)).collect();
    format!("vec4<f32>({})", parts.join(", "))
}

/// Failure to read literal text back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed literal near `{0}`")]
pub struct LiteralError(pub String);

/// Read every `vec4<f32>(..)` row out of literal text, in order.
pub fn parse_literal(text: &str) -> Result<Vec<Row>, LiteralError> {
    const OPEN: &str = "vec4<f32>(";
    let mut rows = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let args = &rest[start + OPEN.len()..];
        let end = args.find(')').ok_or_else(|| LiteralError(args.to_string()))?;
        let values = args[..end]
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| LiteralError(args[..end].to_string()))?;
        let row: Row = values
            .try_into()
            .map_err(|_| LiteralError(args[..end].to_string()))?;
        rows.push(row);
        rest = &args[end + 1..];
    }
    Ok(rows)
}

/// Placeholder filling arrays that would otherwise be empty.
fn zero_literal(struct_name: &str, rows: usize) -> String {
    let zeros = vec![vec4_literal(&[0.0; 4]); rows];
    format!("{struct_name}({})", zeros.join(", "))
}

/// Module-scope declarations: counts, arrays sized at least 1, ambient light.
pub fn declarations(scene: &Scene) -> String {
    let mut out = String::new();
    let entries = [
        ("PRIMITIVE_COUNT", "primitives", Primitive::STRUCT, scene.primitives.len()),
        ("LIGHT_COUNT", "lights", Light::STRUCT, scene.lights.len()),
        ("MATERIAL_COUNT", "materials", Material::STRUCT, scene.materials.len()),
    ];
    for (count, array, ty, len) in entries {
        let _ = writeln!(out, "const {count}: u32 = {len}u;");
        let _ = writeln!(out, "var<private> {array}: array<{ty}, {}>;", len.max(1));
    }
    let _ = write!(out, "var<private> ambient_light: vec4<f32> = {};", scene.ambient.literal());
    out
}

/// Assignment statements that fill the scene arrays.
pub fn constructors(scene: &Scene, indent: &str) -> String {
    let mut lines = Vec::new();
    let mut assign = |array: &str, index: usize, literal: String| {
        lines.push(format!("{indent}{array}[{index}] = {literal};"));
    };
    for (i, primitive) in scene.primitives.iter().enumerate() {
        assign("primitives", i, primitive.literal());
    }
    for (i, light) in scene.lights.iter().enumerate() {
        assign("lights", i, light.literal());
    }
    for (i, material) in scene.materials.iter().enumerate() {
        assign("materials", i, material.literal());
    }
    // keep unused slots well defined
    if scene.primitives.is_empty() {
        assign("primitives", 0, zero_literal(Primitive::STRUCT, 3));
    }
    if scene.lights.is_empty() {
        assign("lights", 0, zero_literal(Light::STRUCT, 2));
    }
    if scene.materials.is_empty() {
        assign("materials", 0, zero_literal(Material::STRUCT, 2));
    }
    lines.join("\n")
}

/// Replace the scene markers in `source`.
pub fn inject_scene(source: &str, scene: &Scene) -> Result<String, TranspileError> {
    let mut found_declarations = false;
    let mut found_constructors = false;
    let mut out = String::with_capacity(source.len() + 256 * (scene.primitives.len() + 4));

    for line in source.lines() {
        let trimmed = line.trim();
        let indent = &line[..line.len() - line.trim_start().len()];
        if trimmed == DECLARATIONS_MARKER {
            found_declarations = true;
            out.push_str(&declarations(scene));
        } else if trimmed == CONSTRUCTORS_MARKER {
            found_constructors = true;
            out.push_str(&constructors(scene, indent));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    if !found_declarations {
        return Err(TranspileError::MissingSceneMarker("declarations"));
    }
    if !found_constructors {
        return Err(TranspileError::MissingSceneMarker("constructors"));
    }
    Ok(out)
}
