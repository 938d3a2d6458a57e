// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stateless element detection on a single photo.

use crate::error::ApiError;
use crate::routes::sessions::{build_frame, extract_scan};
use crate::types::{DetectResponse, DetectedElement};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use wallscan_vision::{detect_elements, detect_wall, Frame, InferenceContext};

/// Segment the wall and localize elements on it, without depth.
fn detect_frame(ctx: &InferenceContext, frame: &Frame) -> wallscan_vision::Result<DetectResponse> {
    let wall = detect_wall(frame, &ctx.config().plane)?;
    let found = detect_elements(frame, &wall, None, ctx)?;
    Ok(DetectResponse {
        wall_confidence: wall.confidence,
        wall_bounds: wall.bounds,
        provenance: found.provenance,
        elements: found
            .elements
            .iter()
            .map(|e| DetectedElement {
                class: e.class,
                confidence: e.confidence,
                bbox: e.bbox,
            })
            .collect(),
    })
}

/// POST /api/v1/detect - Detect elements in one photo (multipart 'file').
pub async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let (data, fields) = extract_scan(
        &mut multipart,
        state.config.max_upload_bytes(),
        state.config.max_upload_mb,
    )
    .await?;
    tracing::info!(size = data.len(), "detect upload");

    let inference = state.inference.clone();
    let response = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let frame = build_frame(&data, &fields)?;
        Ok(detect_frame(&inference, &frame)?)
    })
    .await??;

    tracing::info!(
        elements = response.elements.len(),
        provenance = ?response.provenance,
        "elements detected"
    );
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wallscan_room::{MaterialCatalog, SessionStore, StitchConfig};
    use wallscan_vision::PerceptionConfig;

    const BOUNDARY: &str = "wallscan-test-boundary";

    fn state() -> AppState {
        AppState {
            sessions: Arc::new(SessionStore::default()),
            catalog: Arc::new(MaterialCatalog::builtin()),
            inference: InferenceContext::new(PerceptionConfig::default()),
            stitch: Arc::new(StitchConfig::default()),
            config: Arc::new(Config::default()),
        }
    }

    /// Light wall with a dark switch plate on it
    fn wall_png() -> Vec<u8> {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([35, 35, 35]));
        for y in 30..210 {
            for x in 50..270 {
                img.put_pixel(x, y, Rgb([200, 200, 190]));
            }
        }
        for y in 110..134 {
            for x in 150..166 {
                img.put_pixel(x, y, Rgb([60, 60, 60]));
            }
        }
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn multipart(png: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"wall.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(png);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Request::post("/api/v1/detect")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_detect_frame_stays_on_wall() {
        let frame = Frame::decode(&wall_png()).unwrap();
        let ctx = InferenceContext::new(PerceptionConfig::default());
        let response = detect_frame(&ctx, &frame).unwrap();
        assert!(response.wall_confidence > 0.0);
        for element in &response.elements {
            assert!((0.0..=1.0).contains(&element.confidence));
            assert_eq!(element.bbox.intersect(&response.wall_bounds), Some(element.bbox));
        }
    }

    #[tokio::test]
    async fn test_detect_route_returns_elements() {
        let response = crate::router(state()).oneshot(multipart(&wall_png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("\"elements\":["), "{}", text);
        assert!(text.contains("\"wall_confidence\":"));
    }

    #[tokio::test]
    async fn test_detect_route_rejects_blank_photo() {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(320, 240, Rgb([90, 90, 90]))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        let response = crate::router(state()).oneshot(multipart(out.get_ref())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_detect_route_requires_file() {
        let request = Request::post("/api/v1/detect")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(format!("--{BOUNDARY}--\r\n")))
            .unwrap();
        let response = crate::router(state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
