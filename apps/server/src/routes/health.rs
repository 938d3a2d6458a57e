// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub active_sessions: usize,
    pub depth_backend: Option<String>,
    pub detection_backend: Option<String>,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "wallscan-server",
        active_sessions: state.sessions.len(),
        depth_backend: state.inference.depth_backend().map(|b| b.name().to_string()),
        detection_backend: state.inference.detection_backend().map(|b| b.name().to_string()),
    })
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/api/v1/health", "Health check endpoint"),
    ("GET", "/api/v1/materials", "List the material catalog"),
    ("GET", "/api/v1/materials/:id/texture", "Procedural PNG preview of a material"),
    ("POST", "/api/v1/detect", "Detect elements in one photo (multipart 'file'), no session"),
    ("POST", "/api/v1/sessions", "Start a scan session"),
    ("GET", "/api/v1/sessions/:id", "Session status"),
    ("DELETE", "/api/v1/sessions/:id", "Reset and remove a session"),
    ("POST", "/api/v1/sessions/:id/scan", "Scan one wall photo (multipart 'file')"),
    ("POST", "/api/v1/sessions/:id/stitch", "Stitch scanned walls into a room"),
    ("GET", "/api/v1/sessions/:id/room", "Last stitched room"),
    ("POST", "/api/v1/sessions/:id/materials", "Apply a material to a wall"),
    ("DELETE", "/api/v1/sessions/:id/materials/:wall_index", "Remove a wall's material"),
    ("GET", "/api/v1/sessions/:id/export/:format", "Download the room as glb, obj or mtl"),
];

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "wallscan-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "Room wall scanning, stitching and 3D export",
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, description)| EndpointInfo {
                method,
                path,
                description,
            })
            .collect(),
    })
}
