// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types and handling for the server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use wallscan_room::Error as RoomError;
use wallscan_vision::Error as VisionError;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing file in request")]
    MissingFile,

    #[error("File too large: maximum size is {max_mb} MB")]
    FileTooLarge { max_mb: usize },

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        ApiError::Room(RoomError::Vision(err))
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ApiError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MULTIPART_ERROR"),
            ApiError::InvalidField { .. } => (StatusCode::BAD_REQUEST, "INVALID_FIELD"),
            ApiError::Join(_) => (StatusCode::INTERNAL_SERVER_ERROR, "TASK_ERROR"),
            ApiError::Room(err) => match err {
                RoomError::Vision(VisionError::InvalidFrame(_)) => {
                    (StatusCode::BAD_REQUEST, "INVALID_FRAME")
                }
                RoomError::Vision(VisionError::DetectionFailure(_)) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "DETECTION_FAILURE")
                }
                RoomError::Vision(VisionError::ResourceUnavailable(_)) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "RESOURCE_UNAVAILABLE")
                }
                RoomError::LowConfidence { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "LOW_CONFIDENCE")
                }
                RoomError::InsufficientData { .. } => (StatusCode::CONFLICT, "INSUFFICIENT_DATA"),
                RoomError::StitchingFailure(_) => (StatusCode::CONFLICT, "STITCHING_FAILURE"),
                RoomError::UnknownMaterial(_) => (StatusCode::NOT_FOUND, "UNKNOWN_MATERIAL"),
                RoomError::IndexOutOfRange { .. } => (StatusCode::BAD_REQUEST, "INDEX_OUT_OF_RANGE"),
                RoomError::EmptyModel => (StatusCode::CONFLICT, "EMPTY_MODEL"),
                RoomError::NotStitched => (StatusCode::CONFLICT, "NOT_STITCHED"),
                RoomError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                RoomError::UnsupportedFormat(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT"),
                RoomError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "CANCELLED"),
                RoomError::Geometry(_)
                | RoomError::Poisoned
                | RoomError::Catalog(_)
                | RoomError::Texture(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        } else {
            tracing::debug!(error = %self, code, "request rejected");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
