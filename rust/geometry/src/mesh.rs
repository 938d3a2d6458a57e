// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures
//!
//! Two representations live here. [`Face`] indexes into a shared `f64`
//! vertex list and is what the room model stores, so adjacent walls can
//! share corner vertices. [`Mesh`] is the flat, triangulated `f32` buffer
//! the GLB writer uploads.

use nalgebra::{Point3, Vector3};

/// A planar polygon referencing shared vertices.
///
/// Winding is counter-clockwise when seen from the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    /// Vertex indices in winding order
    #[inline]
    pub fn indices(&self) -> &[u32] {
        match self {
            Face::Triangle(idx) => idx,
            Face::Quad(idx) => idx,
        }
    }

    /// Number of corners (3 or 4)
    #[inline]
    pub fn len(&self) -> usize {
        self.indices().len()
    }

    /// Faces always have at least three corners
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Directed edges (a, b) in winding order, closing back to the first corner
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let idx = self.indices();
        (0..idx.len()).map(move |i| (idx[i], idx[(i + 1) % idx.len()]))
    }

    /// Fan triangulation preserving winding
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        match *self {
            Face::Triangle(t) => vec![t],
            Face::Quad([a, b, c, d]) => vec![[a, b, c], [a, c, d]],
        }
    }

    /// Newell normal of the polygon; zero for degenerate faces
    pub fn normal(&self, vertices: &[Point3<f64>]) -> Vector3<f64> {
        let idx = self.indices();
        let mut n = Vector3::zeros();
        for i in 0..idx.len() {
            let cur = vertices[idx[i] as usize];
            let next = vertices[idx[(i + 1) % idx.len()] as usize];
            n.x += (cur.y - next.y) * (cur.z + next.z);
            n.y += (cur.z - next.z) * (cur.x + next.x);
            n.z += (cur.x - next.x) * (cur.y + next.y);
        }
        n.try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
    }

    /// Polygon area (for planar faces)
    pub fn area(&self, vertices: &[Point3<f64>]) -> f64 {
        self.triangles()
            .iter()
            .map(|[a, b, c]| {
                let p0 = vertices[*a as usize];
                let e1 = vertices[*b as usize] - p0;
                let e2 = vertices[*c as usize] - p0;
                e1.cross(&e2).norm() * 0.5
            })
            .sum()
    }
}

/// Flat triangle buffer in the layout GLB accessors expect
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Build a flat-shaded mesh from a subset of indexed faces.
    ///
    /// Every face gets its own copy of its corners so the face normal can be
    /// stored per vertex without smoothing across wall corners.
    pub fn from_faces<'a, I>(vertices: &[Point3<f64>], faces: I) -> Self
    where
        I: IntoIterator<Item = &'a Face>,
    {
        let mut mesh = Mesh::new();
        for face in faces {
            let normal = face.normal(vertices);
            let base = mesh.vertex_count() as u32;
            for &i in face.indices() {
                mesh.add_vertex(vertices[i as usize], normal);
            }
            let local = match face {
                Face::Triangle(_) => vec![[0, 1, 2]],
                Face::Quad(_) => vec![[0, 1, 2], [0, 2, 3]],
            };
            for [a, b, c] in local {
                mesh.add_triangle(base + a, base + b, base + c);
            }
        }
        mesh
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;

        self.positions.reserve(other.positions.len());
        self.normals.reserve(other.normals.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Calculate bounds (min, max)
    #[inline]
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            min.x = min.x.min(chunk[0]);
            min.y = min.y.min(chunk[1]);
            min.z = min.z.min(chunk[2]);
            max.x = max.x.max(chunk[0]);
            max.y = max.y.max(chunk[1]);
            max.z = max.z.max(chunk[2]);
        });

        (min, max)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_quad_edges_close_the_loop() {
        let face = Face::Quad([4, 5, 6, 7]);
        let edges: Vec<_> = face.edges().collect();
        assert_eq!(edges, vec![(4, 5), (5, 6), (6, 7), (7, 4)]);
        assert_eq!(face.len(), 4);
    }

    #[test]
    fn test_quad_normal_and_area() {
        let verts = unit_square();
        let face = Face::Quad([0, 1, 2, 3]);
        let n = face.normal(&verts);
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(face.area(&verts), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_faces_is_flat_shaded() {
        let verts = unit_square();
        let faces = [Face::Quad([0, 1, 2, 3]), Face::Triangle([0, 2, 1])];
        let mesh = Mesh::from_faces(&verts, faces.iter());

        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.triangle_count(), 3);
        // Reversed triangle points the other way
        assert_eq!(&mesh.normals[12..15], &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_merge() {
        let mut mesh1 = Mesh::new();
        mesh1.add_vertex(Point3::new(0.0, 0.0, 0.0), Vector3::z());
        mesh1.add_triangle(0, 0, 0);

        let mut mesh2 = Mesh::new();
        mesh2.add_vertex(Point3::new(1.0, 1.0, 1.0), Vector3::y());
        mesh2.add_triangle(0, 0, 0);

        mesh1.merge(&mesh2);
        assert_eq!(mesh1.vertex_count(), 2);
        assert_eq!(mesh1.triangle_count(), 2);
        assert_eq!(&mesh1.indices[3..], &[1, 1, 1]);
    }

    #[test]
    fn test_bounds() {
        let verts = unit_square();
        let mesh = Mesh::from_faces(&verts, [Face::Quad([0, 1, 2, 3])].iter());
        let (min, max) = mesh.bounds();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
    }
}
