// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-frame wall perception
//!
//! This crate turns one camera frame into:
//! 1. A [`WallScan`]: wall mask, pixel bounds, camera-space plane and confidence
//! 2. A relative [`DepthMap`] (network backend or gradient proxy)
//! 3. An [`ElementSet`] of outlets, switches, windows and doors placed on the wall
//!
//! All three stages are stateless; frames can be processed in parallel.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wallscan_vision::{scan_frame, Frame, InferenceContext, PerceptionConfig};
//!
//! let ctx = InferenceContext::new(PerceptionConfig::default());
//! let frame = Frame::decode(&jpeg_bytes)?.with_heading(0.0);
//! let scan = scan_frame(&ctx, &frame)?;
//! println!("confidence {}", scan.wall.confidence);
//! ```

pub mod config;
pub mod contour;
pub mod depth_estimator;
pub mod element_detector;
pub mod error;
pub mod image_ops;
pub mod inference;
pub mod ransac;
pub mod types;
pub mod wall_detector;

// Re-export commonly used types and functions
pub use config::{DepthConfig, ElementConfig, InferenceMode, PerceptionConfig, PlaneConfig};
pub use depth_estimator::estimate_depth;
pub use element_detector::detect_elements;
pub use error::{Error, InferenceError, Result};
pub use inference::{DepthBackend, DetectionBackend, InferenceContext};
pub use types::{
    CameraIntrinsics, DepthImage, DepthMap, DetectedBox, Element, ElementClass, ElementSet, Frame,
    FrameScan, PixelRect, PlaneFit, Point2D, Provenance, WallScan,
};
pub use wall_detector::detect_wall;

use rayon::prelude::*;
use tracing::debug;

/// Run the full per-frame pipeline: wall, depth, elements.
///
/// The depth map is attached to the returned wall scan.
pub fn scan_frame(ctx: &InferenceContext, frame: &Frame) -> Result<FrameScan> {
    let mut wall = detect_wall(frame, &ctx.config().plane)?;
    let depth = estimate_depth(frame, Some(&wall), ctx)?;
    let elements = detect_elements(frame, &wall, Some(&depth), ctx)?;
    wall.depth = Some(depth);

    debug!(
        scan = %wall.id,
        confidence = wall.confidence,
        elements = elements.elements.len(),
        "frame scanned"
    );
    Ok(FrameScan { wall, elements })
}

/// Scan many frames in parallel; results keep the input order
pub fn scan_frames(ctx: &InferenceContext, frames: &[Frame]) -> Vec<Result<FrameScan>> {
    frames.par_iter().map(|frame| scan_frame(ctx, frame)).collect()
}
