// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inference backends and the shared, read-only context passed to every
//! per-frame call.
//!
//! Loaded network weights live behind `Arc<dyn ...>` inside an
//! [`InferenceContext`]; cloning the context is cheap and there is no global
//! model state.

use crate::config::PerceptionConfig;
use crate::error::InferenceError;
use crate::types::{DepthImage, DetectedBox, PixelRect};
use image::RgbImage;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

/// Monocular depth network
pub trait DepthBackend: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Network input resolution `(width, height)`
    fn input_size(&self) -> (u32, u32);

    /// Relative depth at input resolution, larger values farther away
    fn infer(&self, image: &RgbImage) -> Result<DepthImage, InferenceError>;
}

/// Fixture detection network
pub trait DetectionBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Class-labelled boxes in full-frame pixel coordinates, restricted to `region`
    fn detect(&self, image: &RgbImage, region: PixelRect) -> Result<Vec<DetectedBox>, InferenceError>;
}

/// Shared configuration and optional network backends
#[derive(Clone, Default)]
pub struct InferenceContext {
    config: Arc<PerceptionConfig>,
    depth: Option<Arc<dyn DepthBackend>>,
    detection: Option<Arc<dyn DetectionBackend>>,
}

impl InferenceContext {
    /// Classical-only context
    pub fn new(config: PerceptionConfig) -> Self {
        Self {
            config: Arc::new(config),
            depth: None,
            detection: None,
        }
    }

    pub fn with_depth_backend(mut self, backend: Arc<dyn DepthBackend>) -> Self {
        self.depth = Some(backend);
        self
    }

    pub fn with_detection_backend(mut self, backend: Arc<dyn DetectionBackend>) -> Self {
        self.detection = Some(backend);
        self
    }

    #[inline]
    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    #[inline]
    pub fn depth_backend(&self) -> Option<&Arc<dyn DepthBackend>> {
        self.depth.as_ref()
    }

    #[inline]
    pub fn detection_backend(&self) -> Option<&Arc<dyn DetectionBackend>> {
        self.detection.as_ref()
    }
}

impl std::fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceContext")
            .field("config", &self.config)
            .field("depth", &self.depth.as_ref().map(|b| b.name().to_string()))
            .field("detection", &self.detection.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

/// Run `task` on a helper thread and wait at most `budget` for it.
///
/// On timeout the helper keeps running to completion in the background and
/// its result is discarded.
pub fn run_with_timeout<T, F>(budget: Duration, task: F) -> Result<T, InferenceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InferenceError> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    std::thread::Builder::new()
        .name("wallscan-inference".into())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(task());
        })
        .map_err(|e| InferenceError::Failed(e.to_string()))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(InferenceError::TimedOut),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(InferenceError::Failed("inference thread panicked".into()))
        }
    }
}
