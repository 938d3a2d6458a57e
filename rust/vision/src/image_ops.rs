// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Image processing operations for wall segmentation and depth proxies

use crate::types::DepthImage;
use image::{GrayImage, Luma, RgbImage};

/// Convert RGB to luminance (ITU-R BT.601)
pub fn luminance(rgb: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (x, y, p) in rgb.enumerate_pixels() {
        let [r, g, b] = p.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray.put_pixel(x, y, Luma([luma.round().min(255.0) as u8]));
    }
    gray
}

/// Apply Gaussian blur for noise reduction
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Apply Canny edge detection
pub fn canny_edges(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    imageproc::edges::canny(image, low_threshold, high_threshold)
}

/// Morphological dilation - expands white regions
pub fn dilate(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::dilate(image, imageproc::distance_transform::Norm::L1, radius)
}

/// Morphological erosion - shrinks white regions
pub fn erode(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::erode(image, imageproc::distance_transform::Norm::L1, radius)
}

/// Morphological closing (dilate then erode) - fills small gaps
pub fn morphological_close(image: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    let dilated = dilate(image, radius);
    erode(&dilated, radius)
}

/// Fraction of `mask` pixels that are also set in `edges`
pub fn edge_density(edges: &GrayImage, mask: &GrayImage) -> f64 {
    let (mut on, mut total) = (0usize, 0usize);
    for (e, m) in edges.pixels().zip(mask.pixels()) {
        if m.0[0] > 0 {
            total += 1;
            if e.0[0] > 0 {
                on += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        on as f64 / total as f64
    }
}

/// Sobel gradient magnitude rescaled so the strongest response is 255.
/// A flat image maps to all zeros.
pub fn gradient_magnitude(image: &GrayImage) -> GrayImage {
    let gradients = imageproc::gradients::sobel_gradients(image);
    let max = gradients.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    let mut out = GrayImage::new(image.width(), image.height());
    if max == 0 {
        return out;
    }
    for (x, y, p) in gradients.enumerate_pixels() {
        let v = (p.0[0] as f32 / max as f32 * 255.0).round() as u8;
        out.put_pixel(x, y, Luma([v]));
    }
    out
}

/// Bilinear resampling of a float image (pixel-center aligned)
pub fn resize_bilinear(src: &DepthImage, width: u32, height: u32) -> DepthImage {
    let (sw, sh) = (src.width(), src.height());
    if sw == 0 || sh == 0 || width == 0 || height == 0 {
        return DepthImage::new(width, height);
    }
    let scale_x = sw as f32 / width as f32;
    let scale_y = sh as f32 / height as f32;
    let max_x = (sw - 1) as f32;
    let max_y = (sh - 1) as f32;

    DepthImage::from_fn(width, height, |x, y| {
        let fx = ((x as f32 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
        let fy = ((y as f32 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(sw - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let p = |px: u32, py: u32| src.get_pixel(px, py).0[0];
        let top = p(x0, y0) * (1.0 - tx) + p(x1, y0) * tx;
        let bottom = p(x0, y1) * (1.0 - tx) + p(x1, y1) * tx;
        Luma([top * (1.0 - ty) + bottom * ty])
    })
}

/// Min-max normalize into `[0, 1]`.
///
/// The range is measured over the pixels selected by `mask` (all pixels when
/// `None` or when the mask selects nothing); values outside it are clamped.
/// Non-finite values become 1.0 (far). A constant image maps to all zeros.
pub fn normalize_unit(values: &mut DepthImage, mask: Option<&GrayImage>) {
    let selected = |x: u32, y: u32| {
        mask.map_or(true, |m| x < m.width() && y < m.height() && m.get_pixel(x, y).0[0] > 0)
    };

    let mut range = (f32::MAX, f32::MIN);
    for (x, y, p) in values.enumerate_pixels() {
        let v = p.0[0];
        if v.is_finite() && selected(x, y) {
            range = (range.0.min(v), range.1.max(v));
        }
    }
    if range.0 > range.1 {
        // Mask selected no finite pixel
        range = values
            .pixels()
            .map(|p| p.0[0])
            .filter(|v| v.is_finite())
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
    }

    let (lo, hi) = range;
    let span = hi - lo;
    for p in values.pixels_mut() {
        let v = p.0[0];
        p.0[0] = if !v.is_finite() {
            1.0
        } else if span > f32::EPSILON {
            ((v - lo) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}
