// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Estimator configuration

use crate::ransac::RansacOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend selection for estimators with a network and a classical path
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InferenceMode {
    /// Network when a backend is loaded, classical otherwise or on failure
    #[default]
    Auto,
    /// Require a loaded network backend (`ResourceUnavailable` otherwise);
    /// a frame whose inference fails or times out still falls back
    Network,
    /// Never touch the network backend
    Classical,
}

/// Plane estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaneConfig {
    /// Gaussian blur sigma before edge detection
    pub blur_sigma: f32,
    /// Canny edge detection low threshold
    pub canny_low: f32,
    /// Canny edge detection high threshold
    pub canny_high: f32,
    /// Morphological closing radius bridging gaps in edges
    pub close_radius: u8,
    /// Smallest accepted wall region, as a fraction of the frame area
    pub min_area_fraction: f64,
    /// Douglas-Peucker tolerance for the mask polygon (pixels)
    pub simplify_epsilon: f64,
    /// Consensus fit of the top and bottom wall edges
    pub ransac: RansacOptions,
    /// Sine of the angle below which the edge lines count as parallel
    pub parallel_tolerance: f64,
    /// Largest wall yaw relative to the optical axis (degrees)
    pub max_yaw_degrees: f64,
    /// Confidence ceiling when the fronto-parallel fallback is used
    pub fallback_confidence: f64,
    /// Nominal camera-to-wall distance along the center ray (meters)
    pub wall_distance: f64,
    /// Erosion applied to the mask before measuring interior edge density
    pub interior_margin: u8,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.4,
            canny_low: 50.0,
            canny_high: 150.0,
            close_radius: 2,
            min_area_fraction: 0.15,
            simplify_epsilon: 2.0,
            ransac: RansacOptions::default(),
            parallel_tolerance: 0.01,
            max_yaw_degrees: 60.0,
            fallback_confidence: 0.5,
            wall_distance: 2.0,
            interior_margin: 4,
        }
    }
}

/// Depth estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DepthConfig {
    pub mode: InferenceMode,
    /// Budget for one network inference (milliseconds)
    pub timeout_ms: u64,
    /// Smoothing of the gradient proxy
    pub fallback_blur_sigma: f32,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Auto,
            timeout_ms: 2000,
            fallback_blur_sigma: 2.0,
        }
    }
}

impl DepthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Element localizer parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElementConfig {
    pub mode: InferenceMode,
    /// Detections below this confidence are dropped
    pub confidence_threshold: f64,
    /// Budget for one detector call (milliseconds)
    pub timeout_ms: u64,
    /// Classical path: accepted blob area range (square pixels)
    pub min_area: f64,
    pub max_area: f64,
    /// Classical path: minimum `4πA / P²`
    pub min_circularity: f64,
    /// Classical path: accepted bounding box aspect range
    pub min_aspect: f64,
    pub max_aspect: f64,
    /// Classical path: blobs with a smaller equivalent radius are outlets
    pub outlet_max_radius: f64,
    /// Classical path: confidence ceiling, below the network path's
    pub classical_confidence: f64,
    /// Classical path: keep at most this many detections
    pub max_classical: usize,
    pub blur_sigma: f32,
    /// Weight of the depth correction along the ray, calibrated cameras
    pub calibrated_depth_weight: f64,
    /// Weight of the depth correction along the ray, default intrinsics
    pub uncalibrated_depth_weight: f64,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Auto,
            confidence_threshold: 0.5,
            timeout_ms: 2000,
            min_area: 100.0,
            max_area: 5000.0,
            min_circularity: 0.5,
            min_aspect: 0.5,
            max_aspect: 2.0,
            outlet_max_radius: 15.0,
            classical_confidence: 0.6,
            max_classical: 5,
            blur_sigma: 1.0,
            calibrated_depth_weight: 0.25,
            uncalibrated_depth_weight: 1.0,
        }
    }
}

impl ElementConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// All per-frame estimator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PerceptionConfig {
    pub plane: PlaneConfig,
    pub depth: DepthConfig,
    pub elements: ElementConfig,
}
