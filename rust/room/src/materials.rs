// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall material catalog
//!
//! The catalog is loaded once at startup (built-in set or a JSON file keyed
//! by material id) and is read-only afterwards.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wallscan_geometry::{is_reserved_group_name, srgb_to_linear, MaterialGroup};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    Paint,
    Wood,
    Brick,
    Wallpaper,
    Concrete,
}

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    /// Catalog key; filled from the JSON object key when omitted
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaterialKind,
    /// sRGB
    pub color: [u8; 3],
    pub roughness: f64,
    pub metallic: f64,
    /// Texture file name
    #[serde(rename = "file")]
    pub texture: String,
}

impl Material {
    fn builtin(id: &str, name: &str, kind: MaterialKind, color: [u8; 3], roughness: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            color,
            roughness,
            metallic: 0.0,
            texture: format!("{}.jpg", id),
        }
    }

    /// Export group carrying this material's PBR parameters
    pub fn to_group(&self, faces: Vec<usize>) -> MaterialGroup {
        MaterialGroup {
            name: self.id.clone(),
            base_color: srgb_to_linear(self.color),
            roughness: self.roughness as f32,
            metallic: self.metallic as f32,
            faces,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Catalog("material with empty id".to_string()));
        }
        // Ids become single-token OBJ/MTL group names
        if self.id.chars().any(char::is_whitespace) {
            return Err(Error::Catalog(format!("material id '{}' contains whitespace", self.id)));
        }
        if is_reserved_group_name(&self.id) {
            return Err(Error::Catalog(format!("material id '{}' is reserved", self.id)));
        }
        if !(0.0..=1.0).contains(&self.roughness) {
            return Err(Error::Catalog(format!(
                "{}: roughness {} outside [0, 1]",
                self.id, self.roughness
            )));
        }
        if !(0.0..=1.0).contains(&self.metallic) {
            return Err(Error::Catalog(format!(
                "{}: metallic {} outside [0, 1]",
                self.id, self.metallic
            )));
        }
        Ok(())
    }
}

/// Read-only mapping from material id to [`Material`], iterated in id order
#[derive(Debug, Clone)]
pub struct MaterialCatalog {
    materials: Vec<Material>,
    index: FxHashMap<String, usize>,
}

impl MaterialCatalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range parameters
    pub fn new(materials: Vec<Material>) -> Result<Self> {
        if materials.is_empty() {
            return Err(Error::Catalog("catalog is empty".to_string()));
        }
        for material in &materials {
            material.validate()?;
        }
        let count = materials.len();
        let catalog = Self::indexed(materials);
        if catalog.index.len() != count {
            return Err(Error::Catalog("duplicate material id".to_string()));
        }
        Ok(catalog)
    }

    fn indexed(mut materials: Vec<Material>) -> Self {
        materials.sort_by(|a, b| a.id.cmp(&b.id));
        let index = materials
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self { materials, index }
    }

    /// The eight stock materials
    pub fn builtin() -> Self {
        use MaterialKind::*;
        let materials = vec![
            Material::builtin("white_paint", "White Paint", Paint, [255, 255, 255], 0.8),
            Material::builtin("beige_paint", "Beige Paint", Paint, [245, 230, 211], 0.8),
            Material::builtin("gray_paint", "Gray Paint", Paint, [169, 169, 169], 0.8),
            Material::builtin("brick_red", "Red Brick", Brick, [200, 90, 84], 0.9),
            Material::builtin("wood_oak", "Oak Wood", Wood, [222, 184, 135], 0.7),
            Material::builtin("wood_dark", "Dark Wood", Wood, [101, 67, 33], 0.6),
            Material::builtin("wallpaper_floral", "Floral Wallpaper", Wallpaper, [232, 212, 241], 0.9),
            Material::builtin("concrete", "Concrete", Concrete, [128, 128, 128], 0.95),
        ];
        Self::indexed(materials)
    }

    /// Parse a JSON object keyed by material id
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: BTreeMap<String, Material> = serde_json::from_str(json)?;
        let materials = entries
            .into_iter()
            .map(|(key, mut material)| {
                if material.id.is_empty() {
                    material.id = key;
                } else if material.id != key {
                    return Err(Error::Catalog(format!(
                        "entry {} declares mismatched id {}",
                        key, material.id
                    )));
                }
                Ok(material)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(materials)
    }

    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Catalog(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_json(&text)
    }

    pub fn get(&self, id: &str) -> Option<&Material> {
        self.index.get(id).map(|&i| &self.materials[i])
    }

    /// Like [`get`](Self::get) but with the binder's error
    pub fn require(&self, id: &str) -> Result<&Material> {
        self.get(id).ok_or_else(|| Error::UnknownMaterial(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = MaterialCatalog::builtin();
        assert_eq!(catalog.len(), 8);

        let brick = catalog.get("brick_red").unwrap();
        assert_eq!(brick.kind, MaterialKind::Brick);
        assert_eq!(brick.color, [200, 90, 84]);
        assert_eq!(brick.texture, "brick_red.jpg");
        assert!(catalog.iter().all(|m| m.metallic == 0.0));

        let ids: Vec<&str> = catalog.iter().map(|m| m.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_require_unknown() {
        let catalog = MaterialCatalog::builtin();
        assert!(matches!(catalog.require("marble"), Err(Error::UnknownMaterial(id)) if id == "marble"));
    }

    #[test]
    fn test_from_json_fills_ids() {
        let json = r#"{
            "slate": {"name": "Slate", "type": "concrete", "color": [70, 80, 90],
                      "roughness": 0.85, "metallic": 0.1, "file": "slate.png"}
        }"#;
        let catalog = MaterialCatalog::from_json(json).unwrap();
        let slate = catalog.get("slate").unwrap();
        assert_eq!(slate.id, "slate");
        assert_eq!(slate.kind, MaterialKind::Concrete);
    }

    #[test]
    fn test_from_json_rejects_bad_roughness() {
        let json = r#"{"x": {"name": "X", "type": "paint", "color": [1, 2, 3],
                             "roughness": 1.5, "metallic": 0.0, "file": "x.jpg"}}"#;
        assert!(matches!(MaterialCatalog::from_json(json), Err(Error::Catalog(_))));
        assert!(matches!(MaterialCatalog::from_json("{}"), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_from_json_rejects_unusable_ids() {
        let entry = |id: &str| {
            format!(
                r#"{{"{}": {{"name": "X", "type": "paint", "color": [1, 2, 3],
                            "roughness": 0.5, "metallic": 0.0, "file": "x.jpg"}}}}"#,
                id
            )
        };
        for id in ["oak panel", "tab\tbed", "default", "ungrouped"] {
            assert!(
                matches!(MaterialCatalog::from_json(&entry(id)), Err(Error::Catalog(_))),
                "{:?} accepted",
                id
            );
        }
        assert!(MaterialCatalog::from_json(&entry("oak_panel")).is_ok());
    }

    #[test]
    fn test_serializes_type_and_file_keys() {
        let catalog = MaterialCatalog::builtin();
        let value = serde_json::to_value(catalog.get("wood_oak").unwrap()).unwrap();
        assert_eq!(value["type"], "wood");
        assert_eq!(value["file"], "wood_oak.jpg");
    }
}
