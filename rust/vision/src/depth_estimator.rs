// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Relative depth per pixel.
//!
//! The network path resizes the frame to the backend's input, runs it under
//! the configured time budget and upsamples the result bilinearly. The
//! classical path is a smoothed gradient-magnitude proxy: textured, sharp
//! areas read as near, flat areas as far. Which path ran is reported through
//! [`DepthMap::provenance`] only.

use crate::config::InferenceMode;
use crate::error::{Error, InferenceError, Result};
use crate::image_ops::{gaussian_blur, gradient_magnitude, luminance, normalize_unit, resize_bilinear};
use crate::inference::{run_with_timeout, DepthBackend, InferenceContext};
use crate::types::{DepthImage, DepthMap, Frame, Provenance, WallScan};
use image::imageops::{self, FilterType};
use image::Luma;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Estimate a depth map at the frame's resolution, values in `[0, 1]`.
///
/// With a scan, normalization uses the wall mask's value range.
///
/// [`InferenceMode::Network`] without a loaded backend is a deployment
/// error and returns `ResourceUnavailable` before any work is done. A loaded
/// backend that fails or runs out of time on one frame is a runtime fault:
/// that frame falls back to the gradient proxy like in `Auto` mode.
pub fn estimate_depth(frame: &Frame, scan: Option<&WallScan>, ctx: &InferenceContext) -> Result<DepthMap> {
    let config = &ctx.config().depth;
    let mask = scan.map(|s| &s.mask);

    let backend = match (config.mode, ctx.depth_backend()) {
        (InferenceMode::Classical, _) | (InferenceMode::Auto, None) => None,
        (InferenceMode::Network, None) => {
            return Err(Error::ResourceUnavailable(
                "network depth requested but no depth backend is loaded".into(),
            ))
        }
        (_, Some(backend)) => Some(backend),
    };

    if let Some(backend) = backend {
        match network_depth(frame, backend, config.timeout()) {
            Ok(mut values) => {
                normalize_unit(&mut values, mask);
                debug!(backend = backend.name(), "network depth");
                return Ok(DepthMap {
                    values,
                    provenance: Provenance::Network,
                });
            }
            Err(err) => warn!(backend = backend.name(), error = %err, "depth inference failed, using gradient proxy"),
        }
    }

    Ok(classical_depth(frame, config.fallback_blur_sigma))
}

fn network_depth(
    frame: &Frame,
    backend: &Arc<dyn DepthBackend>,
    budget: Duration,
) -> std::result::Result<DepthImage, InferenceError> {
    let (in_w, in_h) = backend.input_size();
    if in_w == 0 || in_h == 0 {
        return Err(InferenceError::Failed("backend reports zero input size".into()));
    }
    let input = imageops::resize(&frame.image, in_w, in_h, FilterType::Triangle);

    let worker = Arc::clone(backend);
    let raw = run_with_timeout(budget, move || worker.infer(&input))?;
    if raw.width() == 0 || raw.height() == 0 {
        return Err(InferenceError::Failed("backend returned an empty depth map".into()));
    }

    Ok(resize_bilinear(&raw, frame.width(), frame.height()))
}

/// Gradient-magnitude proxy: `1 - blur(|∇I|)`, in `[0, 1]`
pub fn classical_depth(frame: &Frame, blur_sigma: f32) -> DepthMap {
    let gray = luminance(&frame.image);
    let gradient = gaussian_blur(&gradient_magnitude(&gray), blur_sigma);
    let values = DepthImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([1.0 - gradient.get_pixel(x, y).0[0] as f32 / 255.0])
    });
    DepthMap {
        values,
        provenance: Provenance::Classical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerceptionConfig;
    use image::{Rgb, RgbImage};

    struct RampBackend;

    impl DepthBackend for RampBackend {
        fn name(&self) -> &str {
            "ramp"
        }

        fn input_size(&self) -> (u32, u32) {
            (32, 24)
        }

        fn infer(&self, image: &RgbImage) -> std::result::Result<DepthImage, InferenceError> {
            assert_eq!(image.dimensions(), (32, 24));
            Ok(DepthImage::from_fn(32, 24, |x, _| Luma([x as f32 * 3.0 - 7.0])))
        }
    }

    struct SlowBackend;

    impl DepthBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn input_size(&self) -> (u32, u32) {
            (8, 8)
        }

        fn infer(&self, _image: &RgbImage) -> std::result::Result<DepthImage, InferenceError> {
            std::thread::sleep(Duration::from_millis(400));
            Ok(DepthImage::new(8, 8))
        }
    }

    fn checker_frame() -> Frame {
        Frame::new(RgbImage::from_fn(64, 48, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([20, 20, 20])
            }
        }))
    }

    fn in_unit_range(depth: &DepthMap) -> bool {
        depth.values.pixels().all(|p| (0.0..=1.0).contains(&p.0[0]))
    }

    #[test]
    fn test_classical_depth_in_range() {
        let ctx = InferenceContext::default();
        let depth = estimate_depth(&checker_frame(), None, &ctx).unwrap();
        assert_eq!(depth.provenance, Provenance::Classical);
        assert_eq!((depth.width(), depth.height()), (64, 48));
        assert!(in_unit_range(&depth));
        let (lo, hi) = depth.range();
        assert!(lo < hi);
    }

    #[test]
    fn test_constant_frame_is_uniformly_far() {
        let frame = Frame::new(RgbImage::from_pixel(16, 16, Rgb([100, 100, 100])));
        let depth = classical_depth(&frame, 2.0);
        assert!(depth.values.pixels().all(|p| p.0[0] == 1.0));
    }

    #[test]
    fn test_network_depth_upsampled_and_normalized() {
        let ctx = InferenceContext::default().with_depth_backend(Arc::new(RampBackend));
        let depth = estimate_depth(&checker_frame(), None, &ctx).unwrap();
        assert_eq!(depth.provenance, Provenance::Network);
        assert_eq!((depth.width(), depth.height()), (64, 48));
        assert!(in_unit_range(&depth));
        assert_eq!(depth.values.get_pixel(0, 10).0[0], 0.0);
        assert_eq!(depth.values.get_pixel(63, 10).0[0], 1.0);
        assert!(depth.values.get_pixel(20, 10).0[0] < depth.values.get_pixel(40, 10).0[0]);
    }

    #[test]
    fn test_timeout_falls_back_to_classical() {
        let mut config = PerceptionConfig::default();
        config.depth.timeout_ms = 20;
        let ctx = InferenceContext::new(config).with_depth_backend(Arc::new(SlowBackend));
        let depth = estimate_depth(&checker_frame(), None, &ctx).unwrap();
        assert_eq!(depth.provenance, Provenance::Classical);
        assert!(in_unit_range(&depth));
    }

    #[test]
    fn test_network_mode_without_backend() {
        let mut config = PerceptionConfig::default();
        config.depth.mode = InferenceMode::Network;
        let ctx = InferenceContext::new(config);
        assert!(matches!(
            estimate_depth(&checker_frame(), None, &ctx),
            Err(Error::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_network_mode_falls_back_on_runtime_failure() {
        let mut config = PerceptionConfig::default();
        config.depth.mode = InferenceMode::Network;
        config.depth.timeout_ms = 20;
        let ctx = InferenceContext::new(config).with_depth_backend(Arc::new(SlowBackend));
        let depth = estimate_depth(&checker_frame(), None, &ctx).unwrap();
        assert_eq!(depth.provenance, Provenance::Classical);
    }

    #[test]
    fn test_classical_mode_ignores_backend() {
        let mut config = PerceptionConfig::default();
        config.depth.mode = InferenceMode::Classical;
        let ctx = InferenceContext::new(config).with_depth_backend(Arc::new(RampBackend));
        let depth = estimate_depth(&checker_frame(), None, &ctx).unwrap();
        assert_eq!(depth.provenance, Provenance::Classical);
    }
}
