// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request types for the API.

use serde::Deserialize;

/// Body of `POST /api/v1/sessions/:id/materials`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyMaterialRequest {
    /// Wall index in scan order.
    pub wall_index: usize,
    /// Catalog material id.
    pub material_id: String,
}

/// Query of `POST /api/v1/sessions/:id/stitch`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StitchOptions {
    /// Overrides the configured ceiling height, metres.
    #[serde(default)]
    pub ceiling_height: Option<f64>,
}

/// Optional camera fields sent next to the image in a scan upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFields {
    pub fx: Option<f64>,
    pub fy: Option<f64>,
    pub cx: Option<f64>,
    pub cy: Option<f64>,
    /// Device heading about the vertical axis, radians.
    pub heading: Option<f64>,
}
