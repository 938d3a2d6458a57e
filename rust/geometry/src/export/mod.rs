// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh interchange writers (Wavefront OBJ and binary glTF)

mod glb;
mod obj;

pub use glb::{write_glb, GLB_MAGIC};
pub use obj::{write_mtl, write_obj, ObjSummary};

use crate::error::{Error, Result};
use crate::mesh::Face;
use crate::topology::validate_faces;
use nalgebra::Point3;

/// Group name for faces without an assigned material
pub const DEFAULT_GROUP: &str = "default";

/// Group name the writers give faces that no group claims
pub const UNGROUPED_GROUP: &str = "ungrouped";

/// Names the writers use for their own groups, unavailable to materials
pub fn is_reserved_group_name(name: &str) -> bool {
    name == DEFAULT_GROUP || name == UNGROUPED_GROUP
}

/// A named set of faces sharing one surface material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGroup {
    /// Material identifier, used as OBJ group/material name and glTF material name
    pub name: String,
    /// Linear RGBA in `[0, 1]`
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metallic: f32,
    /// Indices into [`ExportMesh::faces`]
    pub faces: Vec<usize>,
}

impl MaterialGroup {
    /// Neutral grey group for faces without an assigned material
    pub fn default_group(faces: Vec<usize>) -> Self {
        Self {
            name: DEFAULT_GROUP.to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            roughness: 0.9,
            metallic: 0.0,
            faces,
        }
    }
}

/// Borrowed view of an indexed polygon mesh split into material groups
#[derive(Debug, Clone)]
pub struct ExportMesh<'a> {
    pub vertices: &'a [Point3<f64>],
    pub faces: &'a [Face],
    pub groups: Vec<MaterialGroup>,
}

impl<'a> ExportMesh<'a> {
    /// Check the preconditions shared by all writers
    pub(crate) fn validate(&self) -> Result<()> {
        if self.faces.is_empty() || self.vertices.is_empty() {
            return Err(Error::EmptyMesh);
        }
        validate_faces(self.faces, self.vertices.len())?;
        for group in &self.groups {
            if let Some(&face) = group.faces.iter().find(|&&f| f >= self.faces.len()) {
                return Err(Error::InvalidGroup {
                    face,
                    face_count: self.faces.len(),
                });
            }
        }
        Ok(())
    }

    /// Groups with at least one face, in declaration order
    pub(crate) fn non_empty_groups(&self) -> impl Iterator<Item = &MaterialGroup> {
        self.groups.iter().filter(|g| !g.faces.is_empty())
    }

    /// Disjoint, non-empty groups covering every face exactly once.
    ///
    /// A face claimed by several groups stays with the first; faces no group
    /// claims are collected into a trailing `ungrouped` group.
    pub(crate) fn partition(&self) -> Vec<MaterialGroup> {
        let mut taken = vec![false; self.faces.len()];
        let mut out = Vec::with_capacity(self.groups.len() + 1);
        for group in self.non_empty_groups() {
            let faces: Vec<usize> = group
                .faces
                .iter()
                .copied()
                .filter(|&f| !std::mem::replace(&mut taken[f], true))
                .collect();
            if !faces.is_empty() {
                out.push(MaterialGroup {
                    faces,
                    ..group.clone()
                });
            }
        }
        let rest: Vec<usize> = (0..self.faces.len()).filter(|&f| !taken[f]).collect();
        if !rest.is_empty() {
            let mut group = MaterialGroup::default_group(rest);
            group.name = UNGROUPED_GROUP.to_string();
            out.push(group);
        }
        out
    }
}

/// Convert an 8-bit sRGB color to linear RGBA (alpha 1)
pub fn srgb_to_linear(rgb: [u8; 3]) -> [f32; 4] {
    let channel = |c: u8| {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_srgb_endpoints() {
        assert_eq!(srgb_to_linear([0, 0, 0]), [0.0, 0.0, 0.0, 1.0]);
        let white = srgb_to_linear([255, 255, 255]);
        assert_relative_eq!(white[0], 1.0, epsilon = 1e-6);
        let mid = srgb_to_linear([128, 128, 128]);
        assert!(mid[0] > 0.2 && mid[0] < 0.23);
    }

    #[test]
    fn test_validate_rejects_bad_group() {
        let verts = [Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let faces = [Face::Triangle([0, 1, 2])];
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![MaterialGroup::default_group(vec![0, 1])],
        };
        assert!(matches!(
            mesh.validate(),
            Err(Error::InvalidGroup { face: 1, face_count: 1 })
        ));
    }

    #[test]
    fn test_partition_covers_each_face_once() {
        let verts = [Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let faces = [
            Face::Triangle([0, 1, 2]),
            Face::Triangle([0, 2, 1]),
            Face::Triangle([1, 2, 0]),
        ];
        let mut brick = MaterialGroup::default_group(vec![0, 1]);
        brick.name = "brick_red".to_string();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![brick, MaterialGroup::default_group(vec![1]), MaterialGroup::default_group(vec![])],
        };
        let parts = mesh.partition();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name, "brick_red");
        assert_eq!(parts[0].faces, vec![0, 1]);
        assert_eq!(parts[1].name, "ungrouped");
        assert_eq!(parts[1].faces, vec![2]);
    }

    #[test]
    fn test_validate_rejects_empty() {
        let mesh = ExportMesh {
            vertices: &[],
            faces: &[],
            groups: Vec::new(),
        };
        assert!(matches!(mesh.validate(), Err(Error::EmptyMesh)));
    }
}
