// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room model export

use crate::error::{Error, Result};
use crate::materials::Material;
use crate::model::RoomModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use wallscan_geometry::{write_glb, write_mtl, write_obj, ExportMesh, MaterialGroup};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Glb,
    Obj,
    /// Material library for the OBJ groups
    Mtl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Glb => "glb",
            ExportFormat::Obj => "obj",
            ExportFormat::Mtl => "mtl",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Glb => "model/gltf-binary",
            ExportFormat::Obj => "model/obj",
            ExportFormat::Mtl => "model/mtl",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "glb" => Ok(ExportFormat::Glb),
            "obj" => Ok(ExportFormat::Obj),
            "mtl" => Ok(ExportFormat::Mtl),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// One group per distinct material (by id order), then the unassigned faces
pub fn material_groups(model: &RoomModel) -> Vec<MaterialGroup> {
    let mut by_material: BTreeMap<&str, (&Material, Vec<usize>)> = BTreeMap::new();
    let mut unassigned = Vec::new();

    for face in 0..model.faces.len() {
        match model.materials.get(&face) {
            Some(material) => by_material
                .entry(material.id.as_str())
                .or_insert_with(|| (material, Vec::new()))
                .1
                .push(face),
            None => unassigned.push(face),
        }
    }

    let mut groups: Vec<MaterialGroup> = by_material
        .into_values()
        .map(|(material, faces)| material.to_group(faces))
        .collect();
    if !unassigned.is_empty() {
        groups.push(MaterialGroup::default_group(unassigned));
    }
    groups
}

fn export_mesh(model: &RoomModel) -> Result<ExportMesh<'_>> {
    if model.faces.is_empty() {
        return Err(Error::EmptyModel);
    }
    Ok(ExportMesh {
        vertices: &model.vertices,
        faces: &model.faces,
        groups: material_groups(model),
    })
}

/// Serialize the room in the requested format
pub fn export(model: &RoomModel, format: ExportFormat) -> Result<Vec<u8>> {
    let mesh = export_mesh(model)?;
    let bytes = match format {
        ExportFormat::Glb => write_glb(&mesh)?,
        ExportFormat::Obj => write_obj(&mesh, None)?,
        ExportFormat::Mtl => write_mtl(&mesh)?,
    };
    Ok(bytes)
}

/// OBJ referencing `mtl_name`, plus the matching MTL library
pub fn export_obj_with_mtl(model: &RoomModel, mtl_name: &str) -> Result<(Vec<u8>, Vec<u8>)> {
    let mesh = export_mesh(model)?;
    Ok((write_obj(&mesh, Some(mtl_name))?, write_mtl(&mesh)?))
}
