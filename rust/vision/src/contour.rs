// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contour extraction and polygon utilities

use crate::types::{PixelRect, Point2D};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};

/// Outer borders of the foreground (non-zero) components of a binary image
pub fn outer_contours(binary: &GrayImage) -> Vec<Vec<Point2D>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.points.len() >= 3)
        .map(|c| {
            c.points
                .iter()
                .map(|p| Point2D::new(p.x as f64, p.y as f64))
                .collect()
        })
        .collect()
}

/// Enclosed area of a closed polygon (shoelace, unsigned)
pub fn polygon_area(points: &[Point2D]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let p = &points[i];
        let q = &points[(i + 1) % points.len()];
        twice += p.x * q.y - q.x * p.y;
    }
    twice.abs() / 2.0
}

/// Perimeter of a closed polygon
pub fn polygon_perimeter(points: &[Point2D]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    (0..points.len())
        .map(|i| points[i].distance_to(&points[(i + 1) % points.len()]))
        .sum()
}

/// Convex hull (Andrew's monotone chain), counter-clockwise in image axes
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &Point2D, a: &Point2D, b: &Point2D| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut hull: Vec<Point2D> = Vec::with_capacity(pts.len() * 2);
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    hull
}

/// Area over convex hull area, in `(0, 1]`; 0 for degenerate input
pub fn convexity(points: &[Point2D]) -> f64 {
    let hull_area = polygon_area(&convex_hull(points));
    if hull_area <= f64::EPSILON {
        return 0.0;
    }
    (polygon_area(points) / hull_area).clamp(0.0, 1.0)
}

/// Douglas-Peucker line simplification algorithm
pub fn douglas_peucker(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let left = douglas_peucker(&points[..=max_idx], epsilon);
        let right = douglas_peucker(&points[max_idx..], epsilon);
        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        vec![*first, *last]
    }
}

/// Douglas-Peucker on a closed ring.
///
/// The ring is split at the point farthest from the first one so both halves
/// are open polylines with distinct endpoints.
pub fn simplify_closed(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 4 {
        return points.to_vec();
    }
    let start = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.distance_to(&start).total_cmp(&b.1.distance_to(&start)))
        .map(|(i, _)| i)
        .unwrap_or(points.len() / 2);
    if far == 0 {
        return points.to_vec();
    }

    let first_half = douglas_peucker(&points[..=far], epsilon);
    let mut second: Vec<Point2D> = points[far..].to_vec();
    second.push(start);
    let second_half = douglas_peucker(&second, epsilon);

    let mut ring = first_half;
    // Skip the shared split point and the repeated start
    ring.extend_from_slice(&second_half[1..second_half.len() - 1]);
    ring
}

/// Calculate perpendicular distance from point to line
pub fn perpendicular_distance(point: &Point2D, line_start: &Point2D, line_end: &Point2D) -> f64 {
    let dx = line_end.x - line_start.x;
    let dy = line_end.y - line_start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-10 {
        return point.distance_to(line_start);
    }

    ((point.x - line_start.x) * dy - (point.y - line_start.y) * dx).abs() / length_sq.sqrt()
}

/// Rasterize a polygon (even-odd rule, pixel centers) into a binary mask.
///
/// Only pixels inside `clip` are touched, so the result never extends past it.
pub fn fill_polygon(polygon: &[Point2D], width: u32, height: u32, clip: PixelRect) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if polygon.len() < 3 {
        return mask;
    }

    let x_end = clip.right().min(width);
    let y_end = clip.bottom().min(height);
    let mut crossings: Vec<f64> = Vec::with_capacity(polygon.len());

    for y in clip.y..y_end {
        let sy = y as f64 + 0.5;
        crossings.clear();
        for i in 0..polygon.len() {
            let a = &polygon[i];
            let b = &polygon[(i + 1) % polygon.len()];
            if (a.y <= sy) != (b.y <= sy) {
                crossings.push(a.x + (sy - a.y) / (b.y - a.y) * (b.x - a.x));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0] - 0.5).ceil().max(clip.x as f64) as u32;
            let end = (span[1] - 0.5).floor();
            if end < start as f64 {
                continue;
            }
            let end = (end as u32).min(x_end.saturating_sub(1));
            for x in start..=end {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }
    mask
}

/// Per-column extremes of a contour inside `bounds`: the topmost point of
/// each column and the bottommost one
pub fn column_extremes(contour: &[Point2D], bounds: &PixelRect) -> (Vec<Point2D>, Vec<Point2D>) {
    let cols = bounds.width as usize;
    let mut top = vec![f64::MAX; cols];
    let mut bottom = vec![f64::MIN; cols];
    for p in contour {
        if p.x < bounds.x as f64 {
            continue;
        }
        let col = (p.x - bounds.x as f64).floor() as usize;
        if col >= cols {
            continue;
        }
        top[col] = top[col].min(p.y);
        bottom[col] = bottom[col].max(p.y);
    }

    let chain = |ys: &[f64]| -> Vec<Point2D> {
        ys.iter()
            .enumerate()
            .filter(|(_, y)| y.is_finite() && y.abs() < f64::MAX)
            .map(|(c, &y)| Point2D::new(bounds.x as f64 + c as f64, y))
            .collect()
    };
    (chain(&top), chain(&bottom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(size, 0.0),
            Point2D::new(size, size),
            Point2D::new(0.0, size),
        ]
    }

    #[test]
    fn test_area_and_perimeter() {
        assert_relative_eq!(polygon_area(&square(10.0)), 100.0);
        assert_relative_eq!(polygon_perimeter(&square(10.0)), 40.0);
        assert_eq!(polygon_area(&square(10.0)[..2]), 0.0);
    }

    #[test]
    fn test_convex_hull_drops_notch() {
        // L-shape: area 75 of a 100 hull
        let l_shape = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 5.0),
            Point2D::new(5.0, 5.0),
            Point2D::new(5.0, 10.0),
            Point2D::new(0.0, 10.0),
        ];
        let hull = convex_hull(&l_shape);
        assert_eq!(hull.len(), 5);
        assert_relative_eq!(polygon_area(&hull), 87.5);
        assert_relative_eq!(convexity(&l_shape), 75.0 / 87.5);
        assert_relative_eq!(convexity(&square(4.0)), 1.0);
    }

    #[test]
    fn test_douglas_peucker() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.1),
            Point2D::new(2.0, -0.1),
            Point2D::new(3.0, 0.0),
            Point2D::new(4.0, 0.0),
        ];
        assert_eq!(douglas_peucker(&points, 0.5).len(), 2);
    }

    #[test]
    fn test_simplify_closed_ring_keeps_corners() {
        let mut ring = Vec::new();
        for i in 0..10 {
            ring.push(Point2D::new(i as f64, 0.0));
        }
        for i in 0..10 {
            ring.push(Point2D::new(10.0, i as f64));
        }
        for i in 0..10 {
            ring.push(Point2D::new(10.0 - i as f64, 10.0));
        }
        for i in 0..10 {
            ring.push(Point2D::new(0.0, 10.0 - i as f64));
        }
        let simplified = simplify_closed(&ring, 0.5);
        assert_eq!(simplified.len(), 4);
        assert_relative_eq!(polygon_area(&simplified), 100.0);
    }

    #[test]
    fn test_perpendicular_distance() {
        let dist = perpendicular_distance(
            &Point2D::new(5.0, 5.0),
            &Point2D::new(0.0, 0.0),
            &Point2D::new(10.0, 0.0),
        );
        assert_relative_eq!(dist, 5.0);
    }

    #[test]
    fn test_fill_polygon_respects_clip() {
        let poly = square(10.0);
        let full = fill_polygon(&poly, 20, 20, PixelRect::new(0, 0, 20, 20));
        let count = full.pixels().filter(|p| p.0[0] > 0).count();
        assert_eq!(count, 100);

        let clipped = fill_polygon(&poly, 20, 20, PixelRect::new(0, 0, 5, 5));
        assert_eq!(clipped.pixels().filter(|p| p.0[0] > 0).count(), 25);
        assert_eq!(clipped.get_pixel(6, 6).0[0], 0);
    }

    #[test]
    fn test_outer_contours_of_filled_block() {
        let mut img = GrayImage::new(30, 30);
        for y in 5..25 {
            for x in 8..20 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let contours = outer_contours(&img);
        assert_eq!(contours.len(), 1);
        let area = polygon_area(&contours[0]);
        // Border pixel centers enclose an 11 x 19 box
        assert_relative_eq!(area, 209.0, epsilon = 1.0);
    }

    #[test]
    fn test_column_extremes() {
        let contour = vec![
            Point2D::new(2.0, 3.0),
            Point2D::new(3.0, 2.0),
            Point2D::new(3.0, 9.0),
            Point2D::new(2.0, 8.0),
        ];
        let bounds = PixelRect::new(2, 2, 3, 8);
        let (top, bottom) = column_extremes(&contour, &bounds);
        assert_eq!(top, vec![Point2D::new(2.0, 3.0), Point2D::new(3.0, 2.0)]);
        assert_eq!(bottom, vec![Point2D::new(2.0, 8.0), Point2D::new(3.0, 9.0)]);
    }
}
