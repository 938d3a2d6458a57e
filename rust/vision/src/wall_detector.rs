// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall segmentation and plane estimation from a single frame.
//!
//! Pipeline:
//! 1. Luminance, blur, Canny, morphological closing
//! 2. Largest outer contour above the minimum area becomes the wall
//! 3. Bounding box, polygon mask
//! 4. RANSAC lines through the top and bottom chains of the contour; their
//!    vanishing point gives the wall's horizontal direction and so its yaw
//! 5. Plane placed at a nominal distance along the center ray
//!
//! The camera is assumed level (no roll or pitch), so the wall normal is
//! horizontal in the camera frame.

use crate::config::PlaneConfig;
use crate::contour::{
    column_extremes, convexity, fill_polygon, outer_contours, polygon_area, simplify_closed,
};
use crate::error::{Error, Result};
use crate::image_ops::{canny_edges, edge_density, erode, gaussian_blur, luminance, morphological_close};
use crate::ransac::{ransac, Line2D, LineEstimator};
use crate::types::{CameraIntrinsics, Frame, PixelRect, PlaneFit, Point2D, WallScan};
use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};
use uuid::Uuid;
use wallscan_geometry::Plane;

/// Outcome of the edge-line consensus
#[derive(Debug, Clone, Copy)]
struct EdgeLines {
    top: Line2D,
    bottom: Line2D,
    inlier_ratio: f64,
}

/// Detect the dominant wall in `frame` and fit its plane.
///
/// Fails with [`Error::DetectionFailure`] only when no contour covers the
/// minimum area; a failed line fit degrades to the fronto-parallel fallback.
pub fn detect_wall(frame: &Frame, config: &PlaneConfig) -> Result<WallScan> {
    let (width, height) = (frame.width(), frame.height());
    if width < 3 || height < 3 {
        return Err(Error::InvalidFrame(format!("frame too small: {}x{}", width, height)));
    }

    let gray = luminance(&frame.image);
    let blurred = gaussian_blur(&gray, config.blur_sigma);
    let edges = canny_edges(&blurred, config.canny_low, config.canny_high);
    let closed = morphological_close(&edges, config.close_radius);

    let frame_area = width as f64 * height as f64;
    let min_area = config.min_area_fraction * frame_area;

    let (contour, area) = outer_contours(&closed)
        .into_iter()
        .map(|c| {
            let a = polygon_area(&c);
            (c, a)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| Error::DetectionFailure("no contours found".into()))?;

    if area < min_area {
        return Err(Error::DetectionFailure(format!(
            "largest region covers {:.1}% of the frame, need {:.1}%",
            100.0 * area / frame_area,
            100.0 * config.min_area_fraction
        )));
    }

    let bounds = PixelRect::enclosing(&contour, width, height)
        .ok_or_else(|| Error::DetectionFailure("empty contour".into()))?;
    let polygon = simplify_closed(&contour, config.simplify_epsilon);
    let mask = fill_polygon(&polygon, width, height, bounds);

    let interior = erode(&mask, config.interior_margin);
    let edge_term = (1.0 - 4.0 * edge_density(&edges, &interior)).clamp(0.05, 1.0);
    let convex_term = convexity(&contour);

    let intrinsics = frame.effective_intrinsics();
    let calibrated = frame.is_calibrated();

    let (normal, plane_fit, confidence, inlier_ratio) = match fit_edge_lines(&contour, &bounds, config) {
        Some(lines) => match normal_from_lines(&lines, &intrinsics, config) {
            Some(normal) => (
                normal,
                PlaneFit::Ransac,
                edge_term * convex_term * lines.inlier_ratio,
                lines.inlier_ratio,
            ),
            None => fallback(edge_term, convex_term, config),
        },
        None => fallback(edge_term, convex_term, config),
    };

    let center = bounds.center();
    let ray = intrinsics.ray(center.x, center.y);
    let anchor = Point3::from(ray * (config.wall_distance / ray.z));
    let plane = Plane::from_point_normal(&anchor, normal)
        .ok_or_else(|| Error::DetectionFailure("degenerate plane normal".into()))?;

    let scan = WallScan {
        id: Uuid::new_v4(),
        mask,
        bounds,
        plane,
        confidence: confidence.clamp(0.0, 1.0),
        plane_fit,
        inlier_ratio,
        intrinsics,
        calibrated,
        heading: frame.heading,
        depth: None,
    };

    debug!(
        area_fraction = area / frame_area,
        edge_term,
        convex_term,
        inlier_ratio,
        confidence = scan.confidence,
        fit = ?scan.plane_fit,
        "wall detected"
    );
    Ok(scan)
}

fn fallback(edge_term: f64, convex_term: f64, config: &PlaneConfig) -> (Vector3<f64>, PlaneFit, f64, f64) {
    warn!("edge line consensus failed, assuming fronto-parallel wall");
    (
        Vector3::z(),
        PlaneFit::Fallback,
        (edge_term * convex_term).min(config.fallback_confidence),
        0.0,
    )
}

/// Consensus lines through the top and bottom boundary of the wall region
fn fit_edge_lines(contour: &[Point2D], bounds: &PixelRect, config: &PlaneConfig) -> Option<EdgeLines> {
    let (top_chain, bottom_chain) = column_extremes(contour, bounds);

    let top = ransac::<LineEstimator>(&top_chain, &config.ransac);
    let bottom = ransac::<LineEstimator>(&bottom_chain, &config.ransac);
    let (top_line, bottom_line) = (top.model?, bottom.model?);

    if !top_line.is_horizontal_ish() || !bottom_line.is_horizontal_ish() {
        debug!("edge lines too steep for a level camera");
        return None;
    }

    let total = top_chain.len() + bottom_chain.len();
    let inlier_ratio = (top.inliers.len() + bottom.inliers.len()) as f64 / total as f64;
    Some(EdgeLines {
        top: top_line,
        bottom: bottom_line,
        inlier_ratio,
    })
}

/// Wall normal from the vanishing point of its top and bottom edges.
///
/// Parallel image lines mean the wall faces the camera. Otherwise the
/// vanishing point `u_v` fixes the wall's horizontal direction
/// `d ∝ ((u_v - cx) / fx, 0, 1)`, and the normal is `d` turned a quarter
/// towards `+z`.
fn normal_from_lines(
    lines: &EdgeLines,
    intrinsics: &CameraIntrinsics,
    config: &PlaneConfig,
) -> Option<Vector3<f64>> {
    let sin_between = lines.top.a * lines.bottom.b - lines.top.b * lines.bottom.a;
    if sin_between.abs() < config.parallel_tolerance {
        return Some(Vector3::z());
    }

    let vp = lines.top.homogeneous().cross(&lines.bottom.homogeneous());
    if vp.z.abs() < 1e-12 {
        return Some(Vector3::z());
    }
    let u_v = vp.x / vp.z;

    let mut d = Vector3::new((u_v - intrinsics.cx) / intrinsics.fx, 0.0, 1.0).try_normalize(1e-12)?;
    if d.x < 0.0 {
        d = -d;
    }
    let normal = Vector3::new(-d.z, 0.0, d.x);

    let max_yaw = config.max_yaw_degrees.to_radians();
    let yaw = normal.x.atan2(normal.z).clamp(-max_yaw, max_yaw);
    Some(Vector3::new(yaw.sin(), 0.0, yaw.cos()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};

    fn frontal_wall_frame() -> Frame {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([40, 40, 40]));
        for y in 40..200 {
            for x in 60..260 {
                img.put_pixel(x, y, Rgb([210, 205, 195]));
            }
        }
        Frame::new(img)
    }

    /// Render a wall rectangle lying on `plane` into an image
    fn projected_wall_frame(normal: Vector3<f64>) -> (Frame, CameraIntrinsics) {
        let k = CameraIntrinsics::default_for(320, 240);
        // Wall centered on the optical axis, 3 m away, 2 m x 1.6 m
        let center = Point3::new(0.0, 0.0, 3.0);
        let right = Vector3::y().cross(&normal).normalize();
        let corners: Vec<Point2D> = [(-1.0, -0.8), (1.0, -0.8), (1.0, 0.8), (-1.0, 0.8)]
            .iter()
            .map(|&(s, h)| k.project(&(center + right * s + Vector3::y() * h)).unwrap())
            .collect();

        let mut img = RgbImage::from_pixel(320, 240, Rgb([30, 30, 30]));
        let inside = |x: f64, y: f64| {
            let mut sign = 0.0f64;
            for i in 0..4 {
                let a = corners[i];
                let b = corners[(i + 1) % 4];
                let c = (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x);
                if sign == 0.0 {
                    sign = c.signum();
                } else if c.signum() != sign {
                    return false;
                }
            }
            true
        };
        for y in 0..240 {
            for x in 0..320 {
                if inside(x as f64 + 0.5, y as f64 + 0.5) {
                    img.put_pixel(x, y, Rgb([220, 215, 200]));
                }
            }
        }
        (Frame::new(img), k)
    }

    #[test]
    fn test_frontal_wall() {
        let frame = frontal_wall_frame();
        let scan = detect_wall(&frame, &PlaneConfig::default()).unwrap();

        println!("bounds {:?} confidence {}", scan.bounds, scan.confidence);
        assert!(scan.confidence > 0.0);
        assert!(scan.mask_within_bounds());
        assert!(scan.bounds.x >= 55 && scan.bounds.x <= 62);
        assert!(scan.bounds.right() >= 258 && scan.bounds.right() <= 265);
        assert_eq!(scan.plane_fit, PlaneFit::Ransac);
        assert!(scan.plane.normal.z > 0.99);
        assert!(scan.mask_contains(160, 120));
        assert!(!scan.mask_contains(10, 10));
    }

    #[test]
    fn test_wall_distance_along_center_ray() {
        let scan = detect_wall(&frontal_wall_frame(), &PlaneConfig::default()).unwrap();
        let center = scan.bounds.center();
        let hit = scan.back_project(center.x, center.y).unwrap();
        assert_relative_eq!(hit.z, 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_yawed_wall_normal_recovered() {
        let yaw: f64 = 25f64.to_radians();
        let truth = Vector3::new(yaw.sin(), 0.0, yaw.cos());
        let (frame, k) = projected_wall_frame(truth);
        let scan = detect_wall(&frame.with_intrinsics(k), &PlaneConfig::default()).unwrap();

        println!("normal {:?} fit {:?}", scan.plane.normal, scan.plane_fit);
        assert_eq!(scan.plane_fit, PlaneFit::Ransac);
        assert!(scan.calibrated);
        let angle = scan.plane.normal.angle(&truth).to_degrees();
        assert!(angle < 6.0, "normal off by {} degrees", angle);
    }

    #[test]
    fn test_opposite_yaw_sign() {
        let yaw: f64 = (-30f64).to_radians();
        let truth = Vector3::new(yaw.sin(), 0.0, yaw.cos());
        let (frame, k) = projected_wall_frame(truth);
        let scan = detect_wall(&frame.with_intrinsics(k), &PlaneConfig::default()).unwrap();
        assert!(scan.plane.normal.x < 0.0);
        assert!(scan.plane.normal.angle(&truth).to_degrees() < 6.0);
    }

    #[test]
    fn test_small_region_is_rejected() {
        let mut img = RgbImage::from_pixel(320, 240, Rgb([40, 40, 40]));
        for y in 100..130 {
            for x in 100..140 {
                img.put_pixel(x, y, Rgb([220, 220, 220]));
            }
        }
        let err = detect_wall(&Frame::new(img), &PlaneConfig::default()).unwrap_err();
        assert!(matches!(err, Error::DetectionFailure(_)));
    }

    #[test]
    fn test_blank_frame_is_rejected() {
        let img = RgbImage::from_pixel(64, 48, Rgb([128, 128, 128]));
        assert!(matches!(
            detect_wall(&Frame::new(img), &PlaneConfig::default()),
            Err(Error::DetectionFailure(_))
        ));
    }

    #[test]
    fn test_fallback_caps_confidence() {
        let config = PlaneConfig {
            ransac: crate::ransac::RansacOptions {
                min_inliers: 100_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let scan = detect_wall(&frontal_wall_frame(), &config).unwrap();
        assert_eq!(scan.plane_fit, PlaneFit::Fallback);
        assert!(scan.confidence > 0.0 && scan.confidence <= 0.5);
        assert_relative_eq!(scan.plane.normal, Vector3::z());
    }

    #[test]
    fn test_noise_does_not_raise_confidence() {
        let clean = frontal_wall_frame();
        let mut noisy = clean.clone();
        for y in 40..200u32 {
            for x in 60..260u32 {
                if (x * 7 + y * 13) % 11 == 0 {
                    noisy.image.put_pixel(x, y, Rgb([20, 20, 20]));
                }
            }
        }
        let config = PlaneConfig::default();
        let a = detect_wall(&clean, &config).unwrap();
        let b = detect_wall(&noisy, &config).unwrap();
        println!("clean {} noisy {}", a.confidence, b.confidence);
        assert!(b.confidence <= a.confidence);
    }
}
