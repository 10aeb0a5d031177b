//! JSON scene loader.
//!
//! Objects are dispatched on their `type` tag through [`object_factory`];
//! each factory deserializes its own typed description and validates the
//! fields it needs. Materials are registered before any object is built, so a
//! rejected description never leaves partial geometry behind.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::camera::Camera;
use crate::cone::Cone;
use crate::cylinder::Cylinder;
use crate::light::{AmbientLight, Light};
use crate::material::{DuplicateName, Material, MaterialId, MaterialTable};
use crate::plane::Plane;
use crate::primitive::Primitive;
use crate::ray::{Color, Vector3};
use crate::scene::{Scene, DEFAULT_MAX_DEPTH};
use crate::sphere::Sphere;

/// Reasons a scene description is rejected.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed scene description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{entity}: missing `type` tag")]
    MissingType { entity: String },

    #[error("{entity}: unknown object type `{tag}`")]
    UnknownObjectType { entity: String, tag: String },

    #[error("{entity}: {source}")]
    InvalidObject {
        entity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity}: duplicate material type `{name}`")]
    DuplicateMaterial { entity: String, name: String },

    #[error("{entity}: unknown material `{name}`")]
    UnknownMaterial { entity: String, name: String },

    #[error("{entity}: missing required field `{field}`")]
    MissingField { entity: String, field: &'static str },

    #[error("{entity}: invalid `{field}`: {reason}")]
    InvalidField {
        entity: String,
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct SceneDescription {
    camera: CameraDescription,
    #[serde(default)]
    objects: Vec<Value>,
    #[serde(default)]
    materials: Vec<MaterialDescription>,
    #[serde(default)]
    lights: Vec<LightDescription>,
    #[serde(default)]
    ambient_light: Option<AmbientDescription>,
    #[serde(default)]
    max_depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CameraDescription {
    origin: [f32; 3],
    #[serde(rename = "lookAt", alias = "look_at")]
    look_at: [f32; 3],
}

#[derive(Debug, Deserialize)]
struct MaterialDescription {
    #[serde(rename = "type")]
    name: String,
    color: Vec<f32>,
    #[serde(default)]
    ambient: f32,
    #[serde(default)]
    diffuse: f32,
    #[serde(default)]
    specular: f32,
    #[serde(default)]
    specular_power: f32,
    #[serde(default)]
    reflective_index: f32,
}

#[derive(Debug, Deserialize)]
struct LightDescription {
    origin: [f32; 3],
    color: Vec<f32>,
    intensity: f32,
}

#[derive(Debug, Deserialize)]
struct AmbientDescription {
    color: Vec<f32>,
    #[serde(default)]
    intensity: f32,
}

#[derive(Debug, Deserialize)]
struct SphereDescription {
    #[serde(default)]
    center: [f32; 3],
    #[serde(default)]
    radius: f32,
    material: String,
}

#[derive(Debug, Deserialize)]
struct PlaneDescription {
    #[serde(default)]
    point: [f32; 3],
    #[serde(default)]
    normal: [f32; 3],
    #[serde(default)]
    checkerboard: bool,
    #[serde(default)]
    checker_size: f32,
    material: String,
}

#[derive(Debug, Deserialize)]
struct ConeDescription {
    #[serde(default)]
    apex: [f32; 3],
    #[serde(default)]
    base: [f32; 3],
    #[serde(default)]
    radius: f32,
    material: String,
}

#[derive(Debug, Deserialize)]
struct CylinderDescription {
    #[serde(default)]
    center1: [f32; 3],
    #[serde(default)]
    center2: [f32; 3],
    #[serde(default)]
    radius: f32,
    material: String,
}

/// Builds one primitive from its raw description.
pub type ObjectFactory = fn(&ObjectContext<'_>, Value) -> Result<Primitive, SceneError>;

/// What a factory needs besides the raw object.
pub struct ObjectContext<'a> {
    /// Human-readable location, e.g. `objects[2] (cone)`.
    pub entity: String,
    pub materials: &'a MaterialTable,
}

/// Factory registered for a `type` tag.
pub fn object_factory(tag: &str) -> Option<ObjectFactory> {
    match tag {
        "sphere" => Some(build_sphere),
        "plane" => Some(build_plane),
        "cone" => Some(build_cone),
        "cylinder" => Some(build_cylinder),
        _ => None,
    }
}

/// Load a scene file. The scene is named after the file stem.
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene, SceneError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let scene = parse_scene(&name, &text)?;
    info!(
        "Loaded scene '{}': {} primitives, {} lights, {} materials",
        scene.name,
        scene.primitives.len(),
        scene.lights.len(),
        scene.materials.len()
    );
    Ok(scene)
}

/// Parse a scene description from JSON text.
pub fn parse_scene(name: &str, json: &str) -> Result<Scene, SceneError> {
    let description: SceneDescription = serde_json::from_str(json)?;

    let origin = Vector3::from_array(description.camera.origin);
    let look_at = Vector3::from_array(description.camera.look_at);
    if origin == look_at {
        return Err(SceneError::InvalidField {
            entity: "camera".into(),
            field: "lookAt",
            reason: "must differ from origin".into(),
        });
    }

    let mut scene = Scene::new(Camera::new(origin, look_at));
    scene.name = name.to_string();

    let max_depth = description.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
    if max_depth == 0 {
        return Err(SceneError::InvalidField {
            entity: "scene".into(),
            field: "max_depth",
            reason: "must be at least 1".into(),
        });
    }
    scene.max_depth = max_depth;

    for (index, material) in description.materials.into_iter().enumerate() {
        let entity = format!("materials[{index}]");
        let parsed = build_material(&entity, &material)?;
        scene
            .materials
            .insert(&material.name, parsed)
            .map_err(|DuplicateName(name)| SceneError::DuplicateMaterial { entity, name })?;
    }

    for (index, light) in description.lights.into_iter().enumerate() {
        scene.lights.push(build_light(&format!("lights[{index}]"), light)?);
    }

    if let Some(ambient) = description.ambient_light {
        scene.ambient = AmbientLight {
            color: parse_color("ambient_light", "color", &ambient.color)?,
            intensity: non_negative("ambient_light", "intensity", ambient.intensity)?,
        };
    }

    for (index, object) in description.objects.into_iter().enumerate() {
        let tag = match object.get("type").and_then(Value::as_str) {
            Some(tag) => tag.to_string(),
            None => {
                return Err(SceneError::MissingType {
                    entity: format!("objects[{index}]"),
                })
            }
        };
        let entity = format!("objects[{index}] ({tag})");
        let factory = object_factory(&tag).ok_or_else(|| SceneError::UnknownObjectType {
            entity: entity.clone(),
            tag: tag.clone(),
        })?;
        let context = ObjectContext {
            entity,
            materials: &scene.materials,
        };
        let primitive = factory(&context, object)?;
        debug!("{}: {:?}", context.entity, primitive);
        scene.primitives.push(primitive);
    }

    Ok(scene)
}

fn build_material(entity: &str, description: &MaterialDescription) -> Result<Material, SceneError> {
    Ok(Material {
        color: parse_color(entity, "color", &description.color)?,
        ambient: description.ambient,
        diffuse: description.diffuse,
        specular: description.specular,
        specular_power: non_negative(entity, "specular_power", description.specular_power)?,
        reflective_index: description.reflective_index,
    })
}

fn build_light(entity: &str, description: LightDescription) -> Result<Light, SceneError> {
    Ok(Light {
        position: Vector3::from_array(description.origin),
        color: parse_color(entity, "color", &description.color)?,
        intensity: non_negative(entity, "intensity", description.intensity)?,
    })
}

fn build_sphere(context: &ObjectContext<'_>, object: Value) -> Result<Primitive, SceneError> {
    let description: SphereDescription = context.deserialize(object)?;
    Ok(Sphere::new(
        context.required_vector("center", description.center)?,
        context.positive("radius", description.radius)?,
        context.material(&description.material)?,
    )
    .into())
}

fn build_plane(context: &ObjectContext<'_>, object: Value) -> Result<Primitive, SceneError> {
    let description: PlaneDescription = context.deserialize(object)?;
    let checker_size = if description.checkerboard {
        Some(context.positive("checker_size", description.checker_size)?)
    } else {
        None
    };
    Ok(Plane::new(
        context.required_vector("point", description.point)?,
        context.required_vector("normal", description.normal)?,
        checker_size,
        context.material(&description.material)?,
    )
    .into())
}

fn build_cone(context: &ObjectContext<'_>, object: Value) -> Result<Primitive, SceneError> {
    let description: ConeDescription = context.deserialize(object)?;
    let apex = context.required_vector("apex", description.apex)?;
    let base = context.required_vector("base", description.base)?;
    context.distinct("base", apex, base)?;
    Ok(Cone::new(
        apex,
        base,
        context.positive("radius", description.radius)?,
        context.material(&description.material)?,
    )
    .into())
}

fn build_cylinder(context: &ObjectContext<'_>, object: Value) -> Result<Primitive, SceneError> {
    let description: CylinderDescription = context.deserialize(object)?;
    let center1 = context.required_vector("center1", description.center1)?;
    let center2 = context.required_vector("center2", description.center2)?;
    context.distinct("center2", center1, center2)?;
    Ok(Cylinder::new(
        center1,
        center2,
        context.positive("radius", description.radius)?,
        context.material(&description.material)?,
    )
    .into())
}

impl ObjectContext<'_> {
    fn deserialize<T: serde::de::DeserializeOwned>(&self, object: Value) -> Result<T, SceneError> {
        serde_json::from_value(object).map_err(|source| SceneError::InvalidObject {
            entity: self.entity.clone(),
            source,
        })
    }

    /// An absent vector deserializes to zero, so zero counts as missing.
    ///
    /// Known defect: this also rejects a legitimate zero vector, e.g. a plane
    /// through the world origin has to give any other point on the plane.
    fn required_vector(&self, field: &'static str, value: [f32; 3]) -> Result<Vector3, SceneError> {
        let v = Vector3::from_array(value);
        if v == Vector3::ZERO {
            return Err(SceneError::MissingField {
                entity: self.entity.clone(),
                field,
            });
        }
        Ok(v)
    }

    fn positive(&self, field: &'static str, value: f32) -> Result<f32, SceneError> {
        if value > 0.0 {
            Ok(value)
        } else {
            Err(SceneError::InvalidField {
                entity: self.entity.clone(),
                field,
                reason: format!("must be greater than zero, got {value}"),
            })
        }
    }

    fn distinct(&self, field: &'static str, a: Vector3, b: Vector3) -> Result<(), SceneError> {
        if a == b {
            return Err(SceneError::InvalidField {
                entity: self.entity.clone(),
                field,
                reason: "axis has zero length".into(),
            });
        }
        Ok(())
    }

    fn material(&self, name: &str) -> Result<MaterialId, SceneError> {
        self.materials.id(name).ok_or_else(|| SceneError::UnknownMaterial {
            entity: self.entity.clone(),
            name: name.to_string(),
        })
    }
}

/// RGB or RGBA; alpha is ignored.
fn parse_color(entity: &str, field: &'static str, value: &[f32]) -> Result<Color, SceneError> {
    match value {
        [r, g, b] | [r, g, b, _] => Ok(Color::new(*r, *g, *b)),
        _ => Err(SceneError::InvalidField {
            entity: entity.to_string(),
            field,
            reason: format!("expected 3 or 4 components, got {}", value.len()),
        }),
    }
}

fn non_negative(entity: &str, field: &'static str, value: f32) -> Result<f32, SceneError> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(SceneError::InvalidField {
            entity: entity.to_string(),
            field,
            reason: format!("must not be negative, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENE: &str = r#"{
        "camera": { "origin": [0, 1, 5], "lookAt": [0, 0, 0] },
        "max_depth": 4,
        "materials": [
            { "type": "red", "color": [1, 0, 0, 1], "ambient": 0.1, "diffuse": 0.8,
              "specular": 0.5, "specular_power": 32, "reflective_index": 0.25 },
            { "type": "floor", "color": [1, 1, 1] }
        ],
        "objects": [
            { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "red" },
            { "type": "plane", "point": [0, -1, 0], "normal": [0, 2, 0],
              "checkerboard": true, "checker_size": 0.5, "material": "floor" },
            { "type": "cone", "apex": [2, 2, 0], "base": [2, 0.01, 0], "radius": 0.5, "material": "red" },
            { "type": "cylinder", "center1": [-2, 0.01, 0], "center2": [-2, 2, 0], "radius": 0.5, "material": "floor" }
        ],
        "lights": [ { "origin": [-2, 3, 2], "color": [1, 1, 1, 1], "intensity": 10 } ],
        "ambient_light": { "color": [1, 1, 1, 1], "intensity": 0.2 }
    }"#;

    #[test]
    fn parses_every_object_type() {
        let scene = parse_scene("test", SCENE).unwrap();
        assert_eq!(scene.max_depth, 4);
        assert_eq!(scene.materials.len(), 2);
        let kinds: Vec<_> = scene.primitives.iter().map(Primitive::kind_name).collect();
        assert_eq!(kinds, ["sphere", "plane", "cone", "cylinder"]);
        assert_eq!(scene.primitives[1].material(), MaterialId(1));
        assert_eq!(scene.lights[0].intensity, 10.0);
        assert!((scene.ambient.intensity - 0.2).abs() < 1e-6);

        match scene.primitives[1] {
            Primitive::Plane(plane) => {
                assert_eq!(plane.normal, Vector3::Y);
                assert_eq!(plane.checker_size, Some(0.5));
            }
            other => panic!("expected plane, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_material_fails_without_geometry() {
        let json = r#"{
            "camera": { "origin": [0, 0, 5], "lookAt": [0, 0, 0] },
            "materials": [
                { "type": "red", "color": [1, 0, 0] },
                { "type": "red", "color": [0.5, 0, 0] }
            ],
            "objects": [ { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "red" } ]
        }"#;
        match parse_scene("dup", json) {
            Err(SceneError::DuplicateMaterial { entity, name }) => {
                assert_eq!(entity, "materials[1]");
                assert_eq!(name, "red");
            }
            other => panic!("expected duplicate material, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_names_the_object() {
        let json = r#"{
            "camera": { "origin": [0, 0, 5], "lookAt": [0, 0, 0] },
            "materials": [ { "type": "red", "color": [1, 0, 0] } ],
            "objects": [ { "type": "torus", "material": "red" } ]
        }"#;
        let err = parse_scene("torus", json).unwrap_err();
        assert!(matches!(err, SceneError::UnknownObjectType { ref tag, .. } if tag == "torus"));
        assert_eq!(err.to_string(), "objects[0] (torus): unknown object type `torus`");
    }

    #[test]
    fn rejects_bad_geometry() {
        let cases = [
            (r#"{ "type": "sphere", "center": [0, 1, 0], "radius": 0, "material": "m" }"#, "radius"),
            (r#"{ "type": "sphere", "radius": 1, "material": "m" }"#, "center"),
            (r#"{ "type": "plane", "point": [0, 1, 0], "normal": [0, 1, 0], "checkerboard": true, "material": "m" }"#, "checker_size"),
            (r#"{ "type": "cone", "apex": [0, 1, 0], "base": [0, 1, 0], "radius": 1, "material": "m" }"#, "base"),
            (r#"{ "type": "cylinder", "center1": [0, 1, 0], "center2": [0, 2, 0], "radius": -1, "material": "m" }"#, "radius"),
        ];
        for (object, field) in cases {
            let json = format!(
                r#"{{ "camera": {{ "origin": [0, 0, 5], "lookAt": [0, 0, 0] }},
                     "materials": [ {{ "type": "m", "color": [1, 1, 1] }} ],
                     "objects": [ {object} ] }}"#
            );
            match parse_scene("bad", &json) {
                Err(SceneError::InvalidField { field: f, .. }) | Err(SceneError::MissingField { field: f, .. }) => {
                    assert_eq!(f, field, "{object}")
                }
                other => panic!("{object}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn zero_vector_counts_as_missing() {
        let json = r#"{
            "camera": { "origin": [0, 0, 5], "lookAt": [0, 0, 0] },
            "materials": [ { "type": "m", "color": [1, 1, 1] } ],
            "objects": [ { "type": "plane", "point": [0, 0, 0], "normal": [0, 1, 0], "material": "m" } ]
        }"#;
        assert!(matches!(
            parse_scene("origin-plane", json),
            Err(SceneError::MissingField { field: "point", .. })
        ));
    }

    #[test]
    fn unknown_material_and_bad_color() {
        let json = r#"{
            "camera": { "origin": [0, 0, 5], "lookAt": [0, 0, 0] },
            "objects": [ { "type": "sphere", "center": [0, 1, 0], "radius": 1, "material": "ghost" } ]
        }"#;
        assert!(matches!(parse_scene("ghost", json), Err(SceneError::UnknownMaterial { .. })));

        let json = r#"{
            "camera": { "origin": [0, 0, 5], "lookAt": [0, 0, 0] },
            "materials": [ { "type": "m", "color": [1, 1] } ]
        }"#;
        assert!(matches!(parse_scene("color", json), Err(SceneError::InvalidField { field: "color", .. })));
    }

    #[test]
    fn malformed_json_and_missing_file() {
        assert!(matches!(parse_scene("broken", "{ not json"), Err(SceneError::Parse(_))));
        assert!(matches!(load_scene("/nonexistent/scene.json"), Err(SceneError::Io { .. })));
    }

    #[test]
    fn loads_from_disk_with_file_stem_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spheres.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SCENE.as_bytes()).unwrap();

        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.name, "spheres");
        assert_eq!(scene.primitives.len(), 4);
    }
}
