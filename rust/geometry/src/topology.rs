// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge topology checks for assembled room meshes

use crate::error::{Error, Result};
use crate::mesh::Face;
use rustc_hash::{FxHashMap, FxHashSet};

/// Undirected edge, stored with the smaller index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    #[inline]
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            Edge(a, b)
        } else {
            Edge(b, a)
        }
    }
}

/// Outcome of the closure check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureReport {
    /// Every edge not marked open is shared by exactly two faces
    pub closed: bool,
    /// Distinct undirected edges in the mesh
    pub edge_count: usize,
    /// Edges used by one face that were not declared open
    pub unmatched: Vec<Edge>,
    /// Edges used by more than two faces
    pub non_manifold: Vec<Edge>,
}

/// Check that every face index refers to an existing vertex
pub fn validate_faces(faces: &[Face], vertex_count: usize) -> Result<()> {
    for (face_idx, face) in faces.iter().enumerate() {
        if let Some(&bad) = face.indices().iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::InvalidFace {
                face: face_idx,
                index: bad,
                vertex_count,
            });
        }
    }
    Ok(())
}

/// Count edge usage and decide whether the surface is closed.
///
/// Edges in `open_boundary` (floor and ceiling rims of a wall-only room) may
/// be used by a single face without breaking closure.
pub fn check_closure(faces: &[Face], open_boundary: &FxHashSet<Edge>) -> ClosureReport {
    let mut usage: FxHashMap<Edge, u32> = FxHashMap::default();
    for face in faces {
        for (a, b) in face.edges() {
            *usage.entry(Edge::new(a, b)).or_insert(0) += 1;
        }
    }

    let mut unmatched = Vec::new();
    let mut non_manifold = Vec::new();
    for (&edge, &count) in &usage {
        if count > 2 {
            non_manifold.push(edge);
        } else if count == 1 && !open_boundary.contains(&edge) {
            unmatched.push(edge);
        }
    }
    unmatched.sort_unstable();
    non_manifold.sort_unstable();

    ClosureReport {
        closed: !faces.is_empty() && unmatched.is_empty() && non_manifold.is_empty(),
        edge_count: usage.len(),
        unmatched,
        non_manifold,
    }
}
