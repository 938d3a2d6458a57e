// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan session endpoints.
//!
//! Everything that touches a session runs on the blocking pool: perception
//! and stitching are CPU-bound, and a session's lock may be held by a stitch
//! in progress.

use crate::error::ApiError;
use crate::types::{
    ApplyMaterialRequest, MaterialApplied, RoomResponse, ScanFields, ScanResponse, SessionCreated,
    SessionStatus, StitchOptions,
};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;
use wallscan_room::{CancelToken, Error as RoomError, ExportFormat, StitchConfig};
use wallscan_vision::{CameraIntrinsics, Frame};

/// Run a session operation on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, RoomError> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

/// Cancels the token when the request future is dropped (client gone or
/// request timeout), so an abandoned stitch stops at its next checkpoint.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn parse_number(field: &str, text: &str) -> Result<f64, ApiError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::InvalidField {
            field: field.to_string(),
            reason: format!("expected a number, got '{}'", text.trim()),
        })
}

/// Extract the image and the optional camera fields from a scan upload.
pub(crate) async fn extract_scan(
    multipart: &mut Multipart,
    max_bytes: usize,
    max_mb: usize,
) -> Result<(Vec<u8>, ScanFields), ApiError> {
    let mut file = None;
    let mut fields = ScanFields::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %name, "Processing multipart field");

        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await?;
                if bytes.len() > max_bytes {
                    return Err(ApiError::FileTooLarge { max_mb });
                }
                tracing::debug!(size = bytes.len(), "Extracted file from multipart");
                file = Some(bytes.to_vec());
            }
            "fx" | "fy" | "cx" | "cy" | "heading" => {
                let value = parse_number(&name, &field.text().await?)?;
                let slot = match name.as_str() {
                    "fx" => &mut fields.fx,
                    "fy" => &mut fields.fy,
                    "cx" => &mut fields.cx,
                    "cy" => &mut fields.cy,
                    _ => &mut fields.heading,
                };
                *slot = Some(value);
            }
            _ => tracing::debug!(field_name = %name, "Ignoring unknown field"),
        }
    }

    let Some(file) = file else {
        tracing::warn!("No 'file' field found in multipart request");
        return Err(ApiError::MissingFile);
    };
    Ok((file, fields))
}

/// Decode the upload and attach intrinsics and heading when given.
///
/// `fy` defaults to `fx`, the principal point to the image center.
pub(crate) fn build_frame(bytes: &[u8], fields: &ScanFields) -> Result<Frame, ApiError> {
    let mut frame = Frame::decode(bytes)?;

    match (fields.fx, fields.fy) {
        (Some(fx), fy) => {
            let intrinsics = CameraIntrinsics::new(
                fx,
                fy.unwrap_or(fx),
                fields.cx.unwrap_or(frame.width() as f64 / 2.0),
                fields.cy.unwrap_or(frame.height() as f64 / 2.0),
            );
            if !intrinsics.is_valid() {
                return Err(ApiError::InvalidField {
                    field: "fx".to_string(),
                    reason: "focal length must be positive".to_string(),
                });
            }
            frame = frame.with_intrinsics(intrinsics);
        }
        (None, Some(_)) => {
            return Err(ApiError::InvalidField {
                field: "fy".to_string(),
                reason: "fy given without fx".to_string(),
            });
        }
        (None, None) => {}
    }

    if let Some(heading) = fields.heading {
        frame = frame.with_heading(heading);
    }
    Ok(frame)
}

/// POST /api/v1/sessions - Start a scan session.
pub async fn create(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let session_id = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(SessionCreated { session_id })))
}

/// GET /api/v1/sessions/:id - Session status.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let sessions = state.sessions.clone();
    let status = blocking(move || {
        sessions.with_session(&id, |s| {
            Ok(SessionStatus {
                session_id: id,
                walls_scanned: s.scan_count(),
                scan_confidences: s.scans().iter().map(|r| r.wall.confidence).collect(),
                stitched: s.model().is_some(),
                age_secs: s.age().as_secs(),
                idle_secs: s.idle().as_secs(),
                statistics: s.model().map(|m| m.statistics()),
            })
        })
    })
    .await?;
    Ok(Json(status))
}

/// DELETE /api/v1/sessions/:id - Reset and remove a session.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let sessions = state.sessions.clone();
    blocking(move || {
        sessions.with_session(&id, |s| {
            s.reset();
            Ok(())
        })?;
        sessions.remove(&id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/scan - Scan one wall photo.
pub async fn scan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    let (data, fields) = extract_scan(
        &mut multipart,
        state.config.max_upload_bytes(),
        state.config.max_upload_mb,
    )
    .await?;
    tracing::info!(session = %id, size = data.len(), heading = ?fields.heading, "scan upload");

    let sessions = state.sessions.clone();
    let inference = state.inference.clone();
    let receipt = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let frame = build_frame(&data, &fields)?;
        Ok(sessions.scan(&id, &inference, &frame)?)
    })
    .await??;

    Ok(Json(ScanResponse::new(id, &receipt)))
}

/// POST /api/v1/sessions/:id/stitch - Stitch scanned walls into a room.
pub async fn stitch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(options): Query<StitchOptions>,
) -> Result<Json<RoomResponse>, ApiError> {
    let mut config: StitchConfig = (*state.stitch).clone();
    if let Some(height) = options.ceiling_height {
        if !(height.is_finite() && height > 0.0) {
            return Err(ApiError::InvalidField {
                field: "ceiling_height".to_string(),
                reason: "must be a positive number of metres".to_string(),
            });
        }
        config.ceiling_height = height;
    }

    let guard = CancelOnDrop(CancelToken::new());
    let cancel = guard.0.clone();
    let sessions = state.sessions.clone();
    let response = blocking(move || {
        sessions.with_session(&id, |s| {
            let model = s.stitch(&config, &cancel)?;
            Ok(RoomResponse::new(id, model))
        })
    })
    .await?;
    drop(guard);

    tracing::info!(
        session = %id,
        walls = response.statistics.wall_count,
        topology = ?response.topology,
        "room stitched"
    );
    Ok(Json(response))
}

/// GET /api/v1/sessions/:id/room - Last stitched room.
pub async fn room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoomResponse>, ApiError> {
    let sessions = state.sessions.clone();
    let response = blocking(move || {
        sessions.with_session(&id, |s| Ok(RoomResponse::new(id, s.require_model()?)))
    })
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/sessions/:id/materials - Apply a material to a wall.
pub async fn apply_material(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApplyMaterialRequest>,
) -> Result<Json<MaterialApplied>, ApiError> {
    let material = state.catalog.require(&request.material_id)?.clone();
    let sessions = state.sessions.clone();
    let catalog = state.catalog.clone();
    let wall_index = request.wall_index;
    blocking(move || {
        sessions.with_session(&id, |s| {
            s.apply_material(&catalog, request.wall_index, &request.material_id)
        })
    })
    .await?;

    Ok(Json(MaterialApplied {
        session_id: id,
        wall_index,
        material,
    }))
}

/// DELETE /api/v1/sessions/:id/materials/:wall_index - Remove a wall's material.
pub async fn clear_material(
    State(state): State<AppState>,
    Path((id, wall_index)): Path<(Uuid, usize)>,
) -> Result<StatusCode, ApiError> {
    let sessions = state.sessions.clone();
    blocking(move || sessions.with_session(&id, |s| s.clear_material(wall_index))).await?;
    tracing::info!(session = %id, wall_index, "material cleared");
    Ok(StatusCode::NO_CONTENT)
}

fn export_name(id: &Uuid, format: ExportFormat) -> String {
    format!("room_{}.{}", id, format.extension())
}

/// GET /api/v1/sessions/:id/export/:format - Download the room.
///
/// An OBJ download names its companion `mtl` download in its `mtllib` line.
pub async fn export(
    State(state): State<AppState>,
    Path((id, format)): Path<(Uuid, String)>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = format.parse()?;
    let sessions = state.sessions.clone();
    let mtl_name = export_name(&id, ExportFormat::Mtl);
    let bytes = blocking(move || {
        sessions.with_session(&id, |s| match format {
            ExportFormat::Obj => s.export_obj_with_mtl(&mtl_name).map(|(obj, _)| obj),
            other => s.export(other),
        })
    })
    .await?;
    tracing::info!(session = %id, %format, size = bytes.len(), "room exported");

    let disposition = format!("attachment; filename=\"{}\"", export_name(&id, format));
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, Rgb([120, 120, 120]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_obj_and_mtl_names_pair_up() {
        let id = Uuid::nil();
        let obj = export_name(&id, ExportFormat::Obj);
        let mtl = export_name(&id, ExportFormat::Mtl);
        assert_eq!(obj.strip_suffix(".obj"), mtl.strip_suffix(".mtl"));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("fx", " 512.5 ").unwrap(), 512.5);
        assert!(matches!(parse_number("fx", "abc"), Err(ApiError::InvalidField { .. })));
        assert!(matches!(parse_number("fx", "NaN"), Err(ApiError::InvalidField { .. })));
    }

    #[test]
    fn test_build_frame_defaults_principal_point() {
        let fields = ScanFields {
            fx: Some(400.0),
            heading: Some(0.5),
            ..Default::default()
        };
        let frame = build_frame(&png(64, 48), &fields).unwrap();
        let k = frame.intrinsics.unwrap();
        assert_eq!((k.fx, k.fy, k.cx, k.cy), (400.0, 400.0, 32.0, 24.0));
        assert_eq!(frame.heading, Some(0.5));
    }

    #[test]
    fn test_build_frame_rejects_fy_alone() {
        let fields = ScanFields {
            fy: Some(400.0),
            ..Default::default()
        };
        assert!(matches!(build_frame(&png(8, 8), &fields), Err(ApiError::InvalidField { .. })));
    }

    #[test]
    fn test_build_frame_rejects_garbage() {
        let err = build_frame(b"not an image", &ScanFields::default()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Room(RoomError::Vision(wallscan_vision::Error::InvalidFrame(_)))
        ));
    }
}
