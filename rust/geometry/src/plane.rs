// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Infinite planes in Hessian normal form (`normal · X = offset`)

use nalgebra::{Point3, Vector3};

/// Wall plane: `normal · X = offset`, with `normal` of unit length
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vector3<f64>,
    /// Signed distance of the plane from the origin along `normal`
    pub offset: f64,
}

impl Plane {
    /// Create a plane from a (not necessarily unit) normal and offset.
    ///
    /// Returns `None` for a zero normal. The offset is rescaled with the
    /// normal so the plane itself does not move.
    pub fn new(normal: Vector3<f64>, offset: f64) -> Option<Self> {
        let len = normal.norm();
        if !len.is_finite() || len < 1e-12 {
            return None;
        }
        Some(Self {
            normal: normal / len,
            offset: offset / len,
        })
    }

    /// Plane through `point` with the given normal
    pub fn from_point_normal(point: &Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        let n = normal.try_normalize(1e-12)?;
        Some(Self {
            normal: n,
            offset: n.dot(&point.coords),
        })
    }

    /// Signed distance from point to plane.
    /// Positive = on the side the normal points to
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }

    /// Closest point on the plane to the origin
    #[inline]
    pub fn anchor(&self) -> Point3<f64> {
        Point3::from(self.normal * self.offset)
    }

    /// Intersect the ray `origin + t * direction`, `t > 0`, with the plane
    pub fn intersect_ray(&self, origin: &Point3<f64>, direction: &Vector3<f64>) -> Option<Point3<f64>> {
        let denom = self.normal.dot(direction);
        if denom.abs() < 1e-12 {
            return None;
        }
        let t = -self.signed_distance(origin) / denom;
        if !t.is_finite() || t <= 0.0 {
            return None;
        }
        Some(origin + direction * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_normalizes() {
        let plane = Plane::new(Vector3::new(0.0, 0.0, 2.0), 4.0).unwrap();
        assert_relative_eq!(plane.normal, Vector3::z());
        assert_relative_eq!(plane.offset, 2.0);
        assert!(Plane::new(Vector3::zeros(), 1.0).is_none());
    }

    #[test]
    fn test_signed_distance() {
        let plane = Plane::new(Vector3::z(), 2.0).unwrap();
        assert_relative_eq!(plane.signed_distance(&Point3::new(5.0, -1.0, 3.0)), 1.0);
        assert_relative_eq!(plane.signed_distance(&Point3::origin()), -2.0);
    }

    #[test]
    fn test_ray_intersection() {
        let plane = Plane::new(Vector3::z(), 2.0).unwrap();
        let hit = plane
            .intersect_ray(&Point3::origin(), &Vector3::new(0.5, 0.0, 1.0))
            .unwrap();
        assert_relative_eq!(hit, Point3::new(1.0, 0.0, 2.0), epsilon = 1e-12);

        // Parallel and behind
        assert!(plane.intersect_ray(&Point3::origin(), &Vector3::x()).is_none());
        assert!(plane.intersect_ray(&Point3::origin(), &-Vector3::z()).is_none());
    }
}
