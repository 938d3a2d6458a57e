// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ / MTL writer
//!
//! Output layout:
//! - `o room`
//! - `v x y z` per shared vertex (6 decimals)
//! - per material group: `g <name>`, `usemtl <name>`, then `f` lines (1-based)
//!
//! A face listed by several groups is written once, under the first; faces
//! outside every group are written last under `ungrouped`.

use super::ExportMesh;
use crate::error::Result;
use std::io::Write;

/// Write the mesh as OBJ text.
///
/// `mtllib` names the companion material file, if one is shipped alongside.
pub fn write_obj(mesh: &ExportMesh<'_>, mtllib: Option<&str>) -> Result<Vec<u8>> {
    mesh.validate()?;

    let mut out = Vec::with_capacity(mesh.vertices.len() * 32 + mesh.faces.len() * 24);
    writeln!(out, "# wallscan room model")?;
    writeln!(out, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(out, "# Faces: {}", mesh.faces.len())?;
    if let Some(lib) = mtllib {
        writeln!(out, "mtllib {}", lib)?;
    }
    writeln!(out, "o room")?;

    for v in mesh.vertices {
        writeln!(out, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
    }

    for group in mesh.partition() {
        writeln!(out, "g {}", group.name)?;
        writeln!(out, "usemtl {}", group.name)?;
        for &face_idx in &group.faces {
            write_face(&mut out, mesh, face_idx)?;
        }
    }

    Ok(out)
}

fn write_face(out: &mut Vec<u8>, mesh: &ExportMesh<'_>, face_idx: usize) -> Result<()> {
    write!(out, "f")?;
    for &i in mesh.faces[face_idx].indices() {
        write!(out, " {}", i + 1)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Companion MTL file for the groups of `mesh` (colors are written linear)
pub fn write_mtl(mesh: &ExportMesh<'_>) -> Result<Vec<u8>> {
    mesh.validate()?;

    let mut out = Vec::new();
    writeln!(out, "# wallscan materials")?;
    for group in mesh.partition() {
        let [r, g, b, a] = group.base_color;
        writeln!(out)?;
        writeln!(out, "newmtl {}", group.name)?;
        writeln!(out, "Kd {:.6} {:.6} {:.6}", r, g, b)?;
        writeln!(out, "d {:.6}", a)?;
        writeln!(out, "Pr {:.6}", group.roughness)?;
        writeln!(out, "Pm {:.6}", group.metallic)?;
    }
    Ok(out)
}

/// Counts recovered by re-reading an OBJ file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjSummary {
    pub vertices: usize,
    pub faces: usize,
    /// `usemtl` names in order of appearance
    pub materials: Vec<String>,
}

impl ObjSummary {
    /// Minimal line-based parse: counts `v` and `f` records and collects `usemtl` names
    pub fn parse(text: &str) -> Self {
        let mut summary = ObjSummary::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("v") => summary.vertices += 1,
                Some("f") if parts.clone().count() >= 3 => summary.faces += 1,
                Some("usemtl") => {
                    if let Some(name) = parts.next() {
                        summary.materials.push(name.to_string());
                    }
                }
                _ => {}
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MaterialGroup;
    use crate::mesh::Face;
    use nalgebra::Point3;

    fn two_quads() -> (Vec<Point3<f64>>, Vec<Face>) {
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
        ];
        let faces = vec![Face::Quad([0, 1, 4, 3]), Face::Quad([1, 2, 5, 4])];
        (verts, faces)
    }

    #[test]
    fn test_obj_groups_and_indices() {
        let (verts, faces) = two_quads();
        let mut paint = MaterialGroup::default_group(vec![1]);
        paint.name = "white_paint".to_string();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![MaterialGroup::default_group(vec![0]), paint],
        };

        let text = String::from_utf8(write_obj(&mesh, None).unwrap()).unwrap();
        println!("{}", text);
        assert!(text.contains("usemtl default\nf 1 2 5 4\n"));
        assert!(text.contains("usemtl white_paint\nf 2 3 6 5\n"));
        assert!(text.contains("v 1.000000 1.000000 0.000000"));

        let summary = ObjSummary::parse(&text);
        assert_eq!(summary.vertices, 6);
        assert_eq!(summary.faces, 2);
        assert_eq!(summary.materials, vec!["default", "white_paint"]);
    }

    #[test]
    fn test_ungrouped_and_duplicate_faces_written_once() {
        let (verts, faces) = two_quads();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![
                MaterialGroup::default_group(vec![0]),
                MaterialGroup::default_group(vec![0]),
            ],
        };
        let text = String::from_utf8(write_obj(&mesh, Some("room.mtl")).unwrap()).unwrap();
        assert!(text.starts_with("# wallscan room model"));
        assert!(text.contains("mtllib room.mtl"));
        assert!(text.contains("g ungrouped\nusemtl ungrouped\nf 2 3 6 5"));
        assert_eq!(ObjSummary::parse(&text).faces, 2);
    }

    #[test]
    fn test_mtl_lists_each_group() {
        let (verts, faces) = two_quads();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![MaterialGroup::default_group(vec![0, 1])],
        };
        let text = String::from_utf8(write_mtl(&mesh).unwrap()).unwrap();
        assert_eq!(text.matches("newmtl").count(), 1);
        assert!(text.contains("Kd 0.800000 0.800000 0.800000"));
    }
}
