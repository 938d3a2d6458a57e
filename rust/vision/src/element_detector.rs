// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall fixture detection and 3D placement.
//!
//! Boxes come from the detection backend when one is loaded, otherwise from a
//! circular-blob search that only knows outlets and light switches. Each kept
//! box center is back-projected onto the wall plane and nudged along its
//! viewing ray by the local depth relative to the wall's mean depth.

use crate::config::{ElementConfig, InferenceMode};
use crate::contour::{outer_contours, polygon_area, polygon_perimeter};
use crate::error::{Error, InferenceError, Result};
use crate::image_ops::{canny_edges, gaussian_blur, luminance, morphological_close};
use crate::inference::{run_with_timeout, DetectionBackend, InferenceContext};
use crate::types::{
    DepthMap, DetectedBox, Element, ElementClass, ElementSet, Frame, PixelRect, Provenance, WallScan,
};
use image::imageops;
use nalgebra::Point3;
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::{debug, warn};

/// Detect fixtures on the wall of `scan` and place them in the camera frame.
///
/// Backend selection follows [`crate::estimate_depth`]: a missing backend in
/// `Network` mode is `ResourceUnavailable`, a failing one falls back.
pub fn detect_elements(
    frame: &Frame,
    scan: &WallScan,
    depth: Option<&DepthMap>,
    ctx: &InferenceContext,
) -> Result<ElementSet> {
    let config = &ctx.config().elements;

    let backend = match (config.mode, ctx.detection_backend()) {
        (InferenceMode::Classical, _) | (InferenceMode::Auto, None) => None,
        (InferenceMode::Network, None) => {
            return Err(Error::ResourceUnavailable(
                "network detection requested but no detection backend is loaded".into(),
            ))
        }
        (_, Some(backend)) => Some(backend),
    };

    let network = backend.and_then(|backend| match network_boxes(frame, scan, backend, config) {
        Ok(boxes) => Some(boxes),
        Err(err) => {
            warn!(backend = backend.name(), error = %err, "detector failed, using blob fallback");
            None
        }
    });

    let (boxes, provenance) = match network {
        Some(boxes) => (boxes, Provenance::Network),
        None => (classical_boxes(frame, scan, config), Provenance::Classical),
    };

    let wall_depth = depth.and_then(|d| d.mean_in(&scan.mask));
    let weight = if scan.calibrated {
        config.calibrated_depth_weight
    } else {
        config.uncalibrated_depth_weight
    };

    let elements: Vec<Element> = boxes
        .into_iter()
        .filter(|b| b.confidence >= config.confidence_threshold)
        .filter(|b| {
            let c = b.bbox.center();
            scan.mask_contains(c.x as u32, c.y as u32)
        })
        .filter_map(|b| {
            let c = b.bbox.center();
            let on_wall = scan.back_project(c.x, c.y)?;
            let scale = match (depth, wall_depth) {
                (Some(d), Some(mean)) => {
                    (1.0 + weight * (d.sample(c.x, c.y) as f64 - mean)).clamp(0.5, 1.5)
                }
                _ => 1.0,
            };
            Some(Element {
                class: b.class,
                bbox: b.bbox,
                confidence: b.confidence,
                position: Point3::from(on_wall.coords * scale),
                wall_id: scan.id,
                provenance,
            })
        })
        .collect();

    debug!(count = elements.len(), ?provenance, "elements localized");
    Ok(ElementSet {
        elements,
        provenance,
    })
}

fn network_boxes(
    frame: &Frame,
    scan: &WallScan,
    backend: &Arc<dyn DetectionBackend>,
    config: &ElementConfig,
) -> std::result::Result<Vec<DetectedBox>, InferenceError> {
    let worker = Arc::clone(backend);
    let image = frame.image.clone();
    let region = scan.bounds;
    let boxes = run_with_timeout(config.timeout(), move || worker.detect(&image, region))?;
    // Boxes are clipped to the wall region; boxes outside it are dropped
    Ok(boxes
        .into_iter()
        .filter_map(|b| b.bbox.intersect(&region).map(|bbox| DetectedBox { bbox, ..b }))
        .collect())
}

/// Circular blobs inside the wall bounds, classified by size.
///
/// Confidence is `classical_confidence × (0.5 + 0.5 × circularity)`, so it
/// never exceeds the classical ceiling.
pub fn classical_boxes(frame: &Frame, scan: &WallScan, config: &ElementConfig) -> Vec<DetectedBox> {
    let b = scan.bounds;
    if b.width < 3 || b.height < 3 {
        return Vec::new();
    }

    let gray = luminance(&frame.image);
    let crop = imageops::crop_imm(&gray, b.x, b.y, b.width, b.height).to_image();
    let edges = canny_edges(&gaussian_blur(&crop, config.blur_sigma), 50.0, 150.0);
    let closed = morphological_close(&edges, 1);

    let mut boxes: Vec<DetectedBox> = outer_contours(&closed)
        .into_iter()
        .filter_map(|contour| {
            let area = polygon_area(&contour);
            if area < config.min_area || area > config.max_area {
                return None;
            }
            let perimeter = polygon_perimeter(&contour);
            if perimeter <= 0.0 {
                return None;
            }
            let circularity = (4.0 * PI * area / (perimeter * perimeter)).min(1.0);
            if circularity < config.min_circularity {
                return None;
            }

            let local = PixelRect::enclosing(&contour, b.width, b.height)?;
            let aspect = local.width as f64 / local.height as f64;
            if aspect < config.min_aspect || aspect > config.max_aspect {
                return None;
            }

            let radius = (area / PI).sqrt();
            let class = if radius < config.outlet_max_radius {
                ElementClass::Outlet
            } else {
                ElementClass::LightSwitch
            };
            Some(DetectedBox {
                class,
                bbox: PixelRect::new(local.x + b.x, local.y + b.y, local.width, local.height),
                confidence: config.classical_confidence * (0.5 + 0.5 * circularity),
            })
        })
        .collect();

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    boxes.truncate(config.max_classical);
    boxes
}
