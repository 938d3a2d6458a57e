// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary glTF 2.0 (GLB) writer
//!
//! Every material group is flattened into its own flat-shaded [`Mesh`] and
//! the pieces are merged into one vertex buffer. The BIN chunk holds three
//! buffer views: positions, normals and the concatenated `u32` indices. Each
//! group gets one index accessor, one glTF material and one primitive of the
//! single mesh.

use super::ExportMesh;
use crate::error::Result;
use crate::mesh::Mesh;
use serde_json::json;

/// `glTF` little-endian
pub const GLB_MAGIC: u32 = 0x4654_6C67;
const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const TRIANGLES: u32 = 4;

/// Serialize the mesh as a self-contained GLB container
pub fn write_glb(mesh: &ExportMesh<'_>) -> Result<Vec<u8>> {
    mesh.validate()?;

    let groups = mesh.partition();
    let mut merged = Mesh::new();
    // (first index, index count) per group
    let mut ranges = Vec::with_capacity(groups.len());
    for group in &groups {
        let part = Mesh::from_faces(mesh.vertices, group.faces.iter().map(|&f| &mesh.faces[f]));
        let start = merged.indices.len();
        merged.merge(&part);
        ranges.push((start, merged.indices.len() - start));
    }

    let (min, max) = merged.bounds();
    let positions_len = merged.positions.len() * 4;
    let normals_len = merged.normals.len() * 4;
    let indices_len = merged.indices.len() * 4;

    let mut bin = Vec::with_capacity(positions_len + normals_len + indices_len);
    bin.extend(merged.positions.iter().flat_map(|v| v.to_le_bytes()));
    bin.extend(merged.normals.iter().flat_map(|v| v.to_le_bytes()));
    bin.extend(merged.indices.iter().flat_map(|v| v.to_le_bytes()));

    let mut accessors = vec![
        json!({
            "bufferView": 0,
            "componentType": FLOAT,
            "count": merged.vertex_count(),
            "type": "VEC3",
            "min": [min.x, min.y, min.z],
            "max": [max.x, max.y, max.z],
        }),
        json!({
            "bufferView": 1,
            "componentType": FLOAT,
            "count": merged.vertex_count(),
            "type": "VEC3",
        }),
    ];
    let mut primitives = Vec::with_capacity(groups.len());
    let mut materials = Vec::with_capacity(groups.len());

    for (i, (group, &(start, count))) in groups.iter().zip(&ranges).enumerate() {
        accessors.push(json!({
            "bufferView": 2,
            "byteOffset": start * 4,
            "componentType": UNSIGNED_INT,
            "count": count,
            "type": "SCALAR",
        }));
        primitives.push(json!({
            "attributes": { "POSITION": 0, "NORMAL": 1 },
            "indices": accessors.len() - 1,
            "material": i,
            "mode": TRIANGLES,
        }));
        materials.push(json!({
            "name": group.name,
            "pbrMetallicRoughness": {
                "baseColorFactor": group.base_color,
                "metallicFactor": group.metallic,
                "roughnessFactor": group.roughness,
            },
            "doubleSided": true,
        }));
    }

    let document = json!({
        "asset": { "version": "2.0", "generator": "wallscan" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "name": "room" }],
        "meshes": [{ "name": "room", "primitives": primitives }],
        "materials": materials,
        "accessors": accessors,
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": positions_len, "target": ARRAY_BUFFER },
            { "buffer": 0, "byteOffset": positions_len, "byteLength": normals_len, "target": ARRAY_BUFFER },
            {
                "buffer": 0,
                "byteOffset": positions_len + normals_len,
                "byteLength": indices_len,
                "target": ELEMENT_ARRAY_BUFFER
            },
        ],
        "buffers": [{ "byteLength": bin.len() }],
    });

    let mut json_bytes = serde_json::to_vec(&document)?;
    pad_to_four(&mut json_bytes, b' ');
    pad_to_four(&mut bin, 0);

    let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());

    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);

    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    out.extend_from_slice(&bin);

    Ok(out)
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MaterialGroup;
    use crate::mesh::Face;
    use nalgebra::Point3;
    use serde_json::Value;

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn sample() -> (Vec<Point3<f64>>, Vec<Face>) {
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 2.5, 0.0),
            Point3::new(0.0, 2.5, 0.0),
            Point3::new(3.0, 0.0, 4.0),
            Point3::new(3.0, 2.5, 4.0),
        ];
        let faces = vec![Face::Quad([0, 1, 2, 3]), Face::Quad([1, 4, 5, 2])];
        (verts, faces)
    }

    #[test]
    fn test_glb_container_layout() {
        let (verts, faces) = sample();
        let mut oak = MaterialGroup::default_group(vec![1]);
        oak.name = "wood_oak".to_string();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![MaterialGroup::default_group(vec![0]), oak],
        };
        let glb = write_glb(&mesh).unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(read_u32(&glb, 4), 2);
        assert_eq!(read_u32(&glb, 8) as usize, glb.len());
        assert_eq!(glb.len() % 4, 0);

        let json_len = read_u32(&glb, 12) as usize;
        assert_eq!(read_u32(&glb, 16), CHUNK_JSON);
        assert_eq!(json_len % 4, 0);
        let doc: Value = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();

        let bin_header = 20 + json_len;
        let bin_len = read_u32(&glb, bin_header) as usize;
        assert_eq!(read_u32(&glb, bin_header + 4), CHUNK_BIN);
        assert_eq!(bin_header + 8 + bin_len, glb.len());
        assert_eq!(doc["buffers"][0]["byteLength"].as_u64().unwrap() as usize, bin_len);

        // Two quads, four corners each, two triangles each
        assert_eq!(doc["accessors"][0]["count"], 8);
        assert_eq!(doc["accessors"][2]["count"], 6);
        assert_eq!(doc["accessors"][3]["count"], 6);
        assert_eq!(doc["accessors"][3]["byteOffset"], 24);
        assert_eq!(doc["accessors"][0]["max"][0].as_f64().unwrap(), 3.0);

        let prims = doc["meshes"][0]["primitives"].as_array().unwrap();
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[1]["material"], 1);
        assert_eq!(doc["materials"][1]["name"], "wood_oak");
        assert_eq!(doc["materials"][0]["doubleSided"], true);
    }

    #[test]
    fn test_glb_index_data_in_range() {
        let (verts, faces) = sample();
        let mesh = ExportMesh {
            vertices: &verts,
            faces: &faces,
            groups: vec![MaterialGroup::default_group(vec![0, 1])],
        };
        let glb = write_glb(&mesh).unwrap();
        let json_len = read_u32(&glb, 12) as usize;
        let bin = &glb[20 + json_len + 8..];

        // positions 8*12, normals 8*12, then 12 indices
        let idx_start = 8 * 12 * 2;
        let indices: Vec<u32> = (0..12).map(|i| read_u32(bin, idx_start + i * 4)).collect();
        assert!(indices.iter().all(|&i| i < 8));
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mesh = ExportMesh {
            vertices: &[],
            faces: &[],
            groups: Vec::new(),
        };
        assert!(write_glb(&mesh).is_err());
    }
}
