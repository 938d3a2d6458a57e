// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for the API.

use serde::Serialize;
use uuid::Uuid;
use wallscan_room::{
    Material, RoomElement, RoomModel, RoomStatistics, ScanReceipt, Topology, WallSummary,
};
use wallscan_vision::{Element, ElementClass, PixelRect, PlaneFit, Provenance};

/// Newly created session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// Element as reported for one scan (camera frame).
#[derive(Debug, Clone, Serialize)]
pub struct ElementData {
    pub class: ElementClass,
    pub bbox: PixelRect,
    pub confidence: f64,
    pub position: [f64; 3],
    pub provenance: Provenance,
}

impl From<&Element> for ElementData {
    fn from(e: &Element) -> Self {
        Self {
            class: e.class,
            bbox: e.bbox,
            confidence: e.confidence,
            position: e.position.coords.into(),
            provenance: e.provenance,
        }
    }
}

/// Result of `POST /api/v1/sessions/:id/scan`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    pub session_id: Uuid,
    pub scan_id: Uuid,
    /// Scan-order index; the wall index once stitched.
    pub wall_index: usize,
    pub confidence: f64,
    pub plane_fit: PlaneFit,
    pub bounds: PixelRect,
    /// Camera-space plane normal.
    pub normal: [f64; 3],
    pub depth_provenance: Option<Provenance>,
    pub element_provenance: Provenance,
    pub elements: Vec<ElementData>,
    pub walls_scanned: usize,
}

impl ScanResponse {
    pub fn new(session_id: Uuid, receipt: &ScanReceipt) -> Self {
        Self {
            session_id,
            scan_id: receipt.scan_id,
            wall_index: receipt.index,
            confidence: receipt.confidence,
            plane_fit: receipt.plane_fit,
            bounds: receipt.bounds,
            normal: receipt.normal.into(),
            depth_provenance: receipt.depth_provenance,
            element_provenance: receipt.element_provenance,
            elements: receipt.elements.iter().map(ElementData::from).collect(),
            walls_scanned: receipt.scans_in_session,
        }
    }
}

/// Per-wall entry of a stitched room.
#[derive(Debug, Clone, Serialize)]
pub struct WallData {
    pub wall_index: usize,
    pub scan_id: Uuid,
    pub confidence: f64,
    pub plane_fit: PlaneFit,
    pub width: f64,
    pub height: f64,
    pub face_index: usize,
    pub order: usize,
    pub normal: [f64; 3],
    /// Row-major camera-to-room matrix.
    pub transform: [[f64; 4]; 4],
    pub material: Option<String>,
}

impl WallData {
    fn new(index: usize, wall: &WallSummary, model: &RoomModel) -> Self {
        Self {
            wall_index: index,
            scan_id: wall.scan_id,
            confidence: wall.confidence,
            plane_fit: wall.plane_fit,
            width: wall.width,
            height: wall.height,
            face_index: wall.face_index,
            order: wall.order,
            normal: wall.normal.into(),
            transform: wall.transform.to_matrix(),
            material: model.material_of(wall.face_index).map(|m| m.id.clone()),
        }
    }
}

/// Element placed in room space.
#[derive(Debug, Clone, Serialize)]
pub struct RoomElementData {
    pub class: ElementClass,
    pub confidence: f64,
    pub position: [f64; 3],
    pub wall_index: usize,
    pub scan_id: Uuid,
    pub provenance: Provenance,
}

impl From<&RoomElement> for RoomElementData {
    fn from(e: &RoomElement) -> Self {
        Self {
            class: e.class,
            confidence: e.confidence,
            position: e.position.coords.into(),
            wall_index: e.wall_index,
            scan_id: e.scan_id,
            provenance: e.provenance,
        }
    }
}

/// Room extents.
#[derive(Debug, Clone, Serialize)]
pub struct BoundsData {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub area: f64,
    pub volume: f64,
}

/// A stitched room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub session_id: Uuid,
    pub topology: Topology,
    pub closure_gap: Option<f64>,
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<Vec<u32>>,
    pub walls: Vec<WallData>,
    pub elements: Vec<RoomElementData>,
    pub bounds: BoundsData,
    pub statistics: RoomStatistics,
}

impl RoomResponse {
    pub fn new(session_id: Uuid, model: &RoomModel) -> Self {
        let b = &model.bounds;
        Self {
            session_id,
            topology: model.topology,
            closure_gap: model.closure_gap,
            vertices: model.vertices.iter().map(|v| v.coords.into()).collect(),
            faces: model.faces.iter().map(|f| f.indices().to_vec()).collect(),
            walls: model
                .walls
                .iter()
                .enumerate()
                .map(|(i, w)| WallData::new(i, w, model))
                .collect(),
            elements: model.elements.iter().map(RoomElementData::from).collect(),
            bounds: BoundsData {
                min: b.min.coords.into(),
                max: b.max.coords.into(),
                width: b.width,
                height: b.height,
                depth: b.depth,
                area: b.area,
                volume: b.volume,
            },
            statistics: model.statistics(),
        }
    }
}

/// Session overview.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub walls_scanned: usize,
    pub scan_confidences: Vec<f64>,
    pub stitched: bool,
    /// Seconds since the session was created.
    pub age_secs: u64,
    /// Seconds since the session was last used.
    pub idle_secs: u64,
    pub statistics: Option<RoomStatistics>,
}

/// Result of applying a material.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialApplied {
    pub session_id: Uuid,
    pub wall_index: usize,
    pub material: Material,
}

/// Material catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialsResponse {
    pub materials: Vec<Material>,
}

/// Element found by `POST /api/v1/detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedElement {
    #[serde(rename = "type")]
    pub class: ElementClass,
    pub confidence: f64,
    pub bbox: PixelRect,
}

/// Result of `POST /api/v1/detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectResponse {
    pub wall_confidence: f64,
    pub wall_bounds: PixelRect,
    pub provenance: Provenance,
    pub elements: Vec<DetectedElement>,
}
