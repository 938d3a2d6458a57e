// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material catalog endpoints.

use crate::error::ApiError;
use crate::types::MaterialsResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use wallscan_room::{texture_png, TEXTURE_SIZE};

/// GET /api/v1/materials - List the catalog.
pub async fn list(State(state): State<AppState>) -> Json<MaterialsResponse> {
    Json(MaterialsResponse {
        materials: state.catalog.iter().cloned().collect(),
    })
}

/// GET /api/v1/materials/:id/texture - Procedural PNG preview.
pub async fn texture(
    State(state): State<AppState>,
    Path(material_id): Path<String>,
) -> Result<Response, ApiError> {
    let material = state.catalog.require(&material_id)?.clone();
    let png = tokio::task::spawn_blocking(move || texture_png(&material, TEXTURE_SIZE)).await??;
    tracing::debug!(material = %material_id, size = png.len(), "texture generated");

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        png,
    )
        .into_response())
}
