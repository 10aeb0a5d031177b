//! Phong-style materials and the dense material index built at load time.

use std::collections::HashMap;

use crate::ray::Color;

/// Dense index into a [`MaterialTable`], assigned in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    /// Position of the material in its table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Surface response coefficients.
///
/// Coefficients are intended to stay in [0, 1] but are not clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Base diffuse color.
    pub color: Color,
    /// Weight of the ambient term.
    pub ambient: f32,
    /// Weight of the Lambert term.
    pub diffuse: f32,
    /// Weight of the Phong highlight.
    pub specular: f32,
    /// Phong exponent.
    pub specular_power: f32,
    /// Fraction of the mirror bounce added to the surface color.
    pub reflective_index: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::ONE,
            ambient: 0.0,
            diffuse: 0.0,
            specular: 0.0,
            specular_power: 0.0,
            reflective_index: 0.0,
        }
    }
}

/// Error returned when a material name is declared twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName(pub String);

/// Named materials, indexed densely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTable {
    materials: Vec<Material>,
    names: Vec<String>,
    index: HashMap<String, MaterialId>,
}

impl MaterialTable {
    /// Register `material` under `name`, returning its new index.
    pub fn insert(&mut self, name: &str, material: Material) -> Result<MaterialId, DuplicateName> {
        if self.index.contains_key(name) {
            return Err(DuplicateName(name.to_string()));
        }
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(material);
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Look up a material index by name.
    pub fn id(&self, name: &str) -> Option<MaterialId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn name(&self, id: MaterialId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Materials in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }
}
