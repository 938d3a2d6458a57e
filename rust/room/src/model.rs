// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Assembled room model

use crate::materials::Material;
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;
use wallscan_geometry::{Face, RigidTransform, RoomBounds};
use wallscan_vision::{ElementClass, PixelRect, PlaneFit, Provenance};

/// Whether the walls form a closed loop
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Closed,
    Open,
}

/// Per-wall facts kept after stitching, indexed by scan order
#[derive(Debug, Clone)]
pub struct WallSummary {
    pub scan_id: Uuid,
    pub confidence: f64,
    pub plane_fit: PlaneFit,
    /// Horizontal extent in metres
    pub width: f64,
    pub height: f64,
    /// Index of the wall's quad in [`RoomModel::faces`]
    pub face_index: usize,
    /// Position of the wall when walking the chain or loop
    pub order: usize,
    /// Camera frame to room frame
    pub transform: RigidTransform,
    /// Unit horizontal normal in room space, pointing out of the room
    pub normal: Vector3<f64>,
}

/// Element re-expressed in room space
#[derive(Debug, Clone, PartialEq)]
pub struct RoomElement {
    pub class: ElementClass,
    pub bbox: PixelRect,
    pub confidence: f64,
    pub position: Point3<f64>,
    /// Scan-order index of the host wall
    pub wall_index: usize,
    pub scan_id: Uuid,
    pub provenance: Provenance,
}

/// Output of the stitcher.
///
/// Vertices and faces are immutable after stitching; only `materials`
/// changes (through the binder).
#[derive(Debug, Clone)]
pub struct RoomModel {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Face>,
    pub wall_count: usize,
    pub walls: Vec<WallSummary>,
    pub elements: Vec<RoomElement>,
    /// Face index to material
    pub materials: BTreeMap<usize, Material>,
    pub bounds: RoomBounds,
    pub topology: Topology,
    /// Gap between the last and first wall before the loop was snapped shut
    pub closure_gap: Option<f64>,
}

/// Aggregate figures for display
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct RoomStatistics {
    pub wall_count: usize,
    /// Sum of wall face areas, square metres
    pub total_area: f64,
    pub average_confidence: f64,
    pub element_count: usize,
    pub closed: bool,
    /// At least two walls were stitched
    pub complete: bool,
}

impl RoomModel {
    pub fn is_closed(&self) -> bool {
        self.topology == Topology::Closed
    }

    /// Faces that belong to the wall at `wall_index` (scan order)
    pub fn wall_faces(&self, wall_index: usize) -> Option<Vec<usize>> {
        self.walls.get(wall_index).map(|w| vec![w.face_index])
    }

    /// Per-wall confidences in scan order
    pub fn confidences(&self) -> Vec<f64> {
        self.walls.iter().map(|w| w.confidence).collect()
    }

    pub fn material_of(&self, face: usize) -> Option<&Material> {
        self.materials.get(&face)
    }

    pub fn statistics(&self) -> RoomStatistics {
        let total_area = self.faces.iter().map(|f| f.area(&self.vertices)).sum();
        let average_confidence = if self.walls.is_empty() {
            0.0
        } else {
            self.walls.iter().map(|w| w.confidence).sum::<f64>() / self.walls.len() as f64
        };
        RoomStatistics {
            wall_count: self.wall_count,
            total_area,
            average_confidence,
            element_count: self.elements.len(),
            closed: self.is_closed(),
            complete: self.wall_count >= 2,
        }
    }
}
