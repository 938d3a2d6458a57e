// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for per-frame wall perception

use crate::error::{Error, Result};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallscan_geometry::Plane;

/// Single-channel `f32` image used for depth maps
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned pixel rectangle; `x + width` and `y + height` are exclusive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle holding every point, clipped to the image
    pub fn enclosing(points: &[Point2D], image_width: u32, image_height: u32) -> Option<Self> {
        if points.is_empty() || image_width == 0 || image_height == 0 {
            return None;
        }
        let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
        let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let x0 = min_x.floor().clamp(0.0, (image_width - 1) as f64) as u32;
        let y0 = min_y.floor().clamp(0.0, (image_height - 1) as f64) as u32;
        let x1 = max_x.floor().clamp(0.0, (image_width - 1) as f64) as u32;
        let y1 = max_y.floor().clamp(0.0, (image_height - 1) as f64) as u32;
        Some(Self::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Pixel-space center
    pub fn center(&self) -> Point2D {
        Point2D::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection with another rectangle, `None` if disjoint
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| PixelRect::new(x0, y0, x1 - x0, y1 - y0))
    }
}

/// Pinhole camera intrinsics in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Reference focal length for a 640 px wide sensor
    pub const DEFAULT_FOCAL_640: f64 = 500.0;

    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Guess for an uncalibrated camera: focal length scaled with the image
    /// width, principal point at the image center
    pub fn default_for(width: u32, height: u32) -> Self {
        let f = Self::DEFAULT_FOCAL_640 * (width as f64 / 640.0);
        Self::new(f, f, width as f64 / 2.0, height as f64 / 2.0)
    }

    /// Viewing ray through pixel `(u, v)` (camera frame, `z = 1`)
    #[inline]
    pub fn ray(&self, u: f64, v: f64) -> Vector3<f64> {
        Vector3::new((u - self.cx) / self.fx, (v - self.cy) / self.fy, 1.0)
    }

    /// Project a camera-frame point; `None` behind the camera
    pub fn project(&self, p: &Point3<f64>) -> Option<Point2D> {
        if p.z <= 1e-12 {
            return None;
        }
        Some(Point2D::new(
            self.fx * p.x / p.z + self.cx,
            self.fy * p.y / p.z + self.cy,
        ))
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0
            && self.cx.is_finite() && self.cy.is_finite()
    }
}

/// One captured camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Calibrated intrinsics, if the capture device supplied them
    pub intrinsics: Option<CameraIntrinsics>,
    /// Device yaw about the vertical axis in radians, if known
    pub heading: Option<f64>,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            intrinsics: None,
            heading: None,
        }
    }

    /// Wrap a raw interleaved buffer with 1 (gray), 3 (RGB) or 4 (RGBA) channels
    pub fn from_raw(width: u32, height: u32, channels: u8, data: &[u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrame("zero-sized frame".into()));
        }
        let pixels = width as usize * height as usize;
        if data.len() != pixels * channels as usize {
            return Err(Error::InvalidFrame(format!(
                "expected {} bytes for {}x{}x{}, got {}",
                pixels * channels as usize,
                width,
                height,
                channels,
                data.len()
            )));
        }

        let rgb: Vec<u8> = match channels {
            1 => data.iter().flat_map(|&g| [g, g, g]).collect(),
            3 => data.to_vec(),
            4 => data.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect(),
            n => return Err(Error::InvalidFrame(format!("unsupported channel count {}", n))),
        };

        RgbImage::from_raw(width, height, rgb)
            .map(Frame::new)
            .ok_or_else(|| Error::InvalidFrame("buffer does not match dimensions".into()))
    }

    /// Decode an encoded image (PNG or JPEG)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::InvalidFrame("zero-sized frame".into()));
        }
        Ok(Frame::new(image))
    }

    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Supplied intrinsics, or the uncalibrated default for this size
    pub fn effective_intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
            .filter(CameraIntrinsics::is_valid)
            .unwrap_or_else(|| CameraIntrinsics::default_for(self.width(), self.height()))
    }

    /// Whether valid calibrated intrinsics were supplied
    pub fn is_calibrated(&self) -> bool {
        self.intrinsics.is_some_and(|k| k.is_valid())
    }
}

/// How the wall plane was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaneFit {
    /// Vanishing-point estimate from consensus line fits
    Ransac,
    /// Fronto-parallel assumption, confidence capped
    Fallback,
}

/// Which path produced a result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Network,
    Classical,
}

/// Dense relative depth, `[0, 1]`, larger is farther
#[derive(Debug, Clone)]
pub struct DepthMap {
    pub values: DepthImage,
    pub provenance: Provenance,
}

impl DepthMap {
    #[inline]
    pub fn width(&self) -> u32 {
        self.values.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.values.height()
    }

    /// Depth at a pixel, clamped to the image
    pub fn sample(&self, x: f64, y: f64) -> f32 {
        let xi = x.floor().clamp(0.0, (self.width() - 1) as f64) as u32;
        let yi = y.floor().clamp(0.0, (self.height() - 1) as f64) as u32;
        self.values.get_pixel(xi, yi).0[0]
    }

    /// Mean depth over the non-zero pixels of `mask`
    pub fn mean_in(&self, mask: &GrayImage) -> Option<f64> {
        let (mut sum, mut count) = (0.0f64, 0usize);
        for (x, y, m) in mask.enumerate_pixels() {
            if m.0[0] > 0 && x < self.width() && y < self.height() {
                sum += self.values.get_pixel(x, y).0[0] as f64;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Lowest and highest value
    pub fn range(&self) -> (f32, f32) {
        self.values
            .pixels()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])))
    }
}

/// One frame's detected wall
#[derive(Debug, Clone)]
pub struct WallScan {
    pub id: Uuid,
    /// Frame-sized binary mask, 255 on the wall
    pub mask: GrayImage,
    /// Pixel extent of the wall region; contains every mask pixel
    pub bounds: PixelRect,
    /// Wall plane in the camera frame (x right, y down, z forward)
    pub plane: Plane,
    pub confidence: f64,
    pub plane_fit: PlaneFit,
    /// Share of chain points supporting the two edge lines
    pub inlier_ratio: f64,
    pub intrinsics: CameraIntrinsics,
    pub calibrated: bool,
    pub heading: Option<f64>,
    pub depth: Option<DepthMap>,
}

impl WallScan {
    #[inline]
    pub fn mask_contains(&self, x: u32, y: u32) -> bool {
        x < self.mask.width() && y < self.mask.height() && self.mask.get_pixel(x, y).0[0] > 0
    }

    /// Every mask pixel lies within `bounds` (1 px tolerance)
    pub fn mask_within_bounds(&self) -> bool {
        let b = self.bounds;
        self.mask.enumerate_pixels().all(|(x, y, p)| {
            p.0[0] == 0
                || (x + 1 >= b.x && x <= b.right() && y + 1 >= b.y && y <= b.bottom())
        })
    }

    /// Back-project a pixel onto the wall plane (camera frame)
    pub fn back_project(&self, u: f64, v: f64) -> Option<Point3<f64>> {
        let ray = self.intrinsics.ray(u, v);
        self.plane.intersect_ray(&Point3::origin(), &ray)
    }
}

/// Fixture classes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ElementClass {
    Outlet,
    LightSwitch,
    Window,
    Door,
}

impl ElementClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementClass::Outlet => "outlet",
            ElementClass::LightSwitch => "light_switch",
            ElementClass::Window => "window",
            ElementClass::Door => "door",
        }
    }
}

/// Class-labelled box as reported by a detector
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectedBox {
    pub class: ElementClass,
    pub bbox: PixelRect,
    pub confidence: f64,
}

/// A localized wall fixture
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub class: ElementClass,
    pub bbox: PixelRect,
    pub confidence: f64,
    /// Camera-frame position of the box center on the wall
    pub position: Point3<f64>,
    /// Scan the element was found in
    pub wall_id: Uuid,
    pub provenance: Provenance,
}

/// Elements of one frame plus the path that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet {
    pub elements: Vec<Element>,
    pub provenance: Provenance,
}

/// Everything the per-frame pipeline produces for one frame
#[derive(Debug, Clone)]
pub struct FrameScan {
    /// Wall scan, with its depth map attached
    pub wall: WallScan,
    pub elements: ElementSet,
}

impl FrameScan {
    pub fn depth_provenance(&self) -> Option<Provenance> {
        self.wall.depth.as_ref().map(|d| d.provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rect_enclosing_and_contains() {
        let pts = vec![Point2D::new(10.2, 5.0), Point2D::new(30.0, 25.9)];
        let r = PixelRect::enclosing(&pts, 100, 100).unwrap();
        assert_eq!(r, PixelRect::new(10, 5, 21, 21));
        assert!(r.contains(30, 25));
        assert!(!r.contains(31, 25));
    }

    #[test]
    fn test_rect_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&PixelRect::new(10, 0, 5, 5)), None);
    }

    #[test]
    fn test_default_intrinsics_scale_with_width() {
        let k = CameraIntrinsics::default_for(1280, 720);
        assert_relative_eq!(k.fx, 1000.0);
        assert_relative_eq!(k.cx, 640.0);
        assert_relative_eq!(k.cy, 360.0);
    }

    #[test]
    fn test_ray_projection_round_trip() {
        let k = CameraIntrinsics::default_for(640, 480);
        let p = Point3::from(k.ray(100.0, 50.0) * 3.0);
        let uv = k.project(&p).unwrap();
        assert_relative_eq!(uv.x, 100.0, epsilon = 1e-9);
        assert_relative_eq!(uv.y, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_frame_from_raw_channels() {
        let gray = Frame::from_raw(2, 1, 1, &[10, 20]).unwrap();
        assert_eq!(gray.image.get_pixel(1, 0).0, [20, 20, 20]);

        let rgba = Frame::from_raw(1, 1, 4, &[1, 2, 3, 255]).unwrap();
        assert_eq!(rgba.image.get_pixel(0, 0).0, [1, 2, 3]);

        assert!(Frame::from_raw(2, 2, 3, &[0; 5]).is_err());
        assert!(Frame::from_raw(1, 1, 2, &[0; 2]).is_err());
        assert!(Frame::from_raw(0, 1, 3, &[]).is_err());
    }

    #[test]
    fn test_effective_intrinsics() {
        let frame = Frame::new(RgbImage::new(320, 240));
        assert!(!frame.is_calibrated());
        assert_relative_eq!(frame.effective_intrinsics().fx, 250.0);

        let bad = Frame::new(RgbImage::new(320, 240))
            .with_intrinsics(CameraIntrinsics::new(0.0, 0.0, 1.0, 1.0));
        assert!(!bad.is_calibrated());
    }

    #[test]
    fn test_depth_mean_in_mask() {
        let values = DepthImage::from_fn(4, 1, |x, _| Luma([x as f32 * 0.25]));
        let depth = DepthMap {
            values,
            provenance: Provenance::Classical,
        };
        let mut mask = GrayImage::new(4, 1);
        mask.put_pixel(2, 0, Luma([255]));
        mask.put_pixel(3, 0, Luma([255]));
        assert_relative_eq!(depth.mean_in(&mask).unwrap(), 0.625);
        assert!(depth.mean_in(&GrayImage::new(4, 1)).is_none());
        assert_eq!(depth.range(), (0.0, 0.75));
    }
}
