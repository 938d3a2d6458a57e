// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned room extents

use nalgebra::Point3;

/// Extents of a room in the gravity-aligned room frame (`+Y` up).
///
/// `area` is the floor area (`width × depth`), `volume` the box volume.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoomBounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
    /// Extent along X
    pub width: f64,
    /// Extent along Y
    pub height: f64,
    /// Extent along Z
    pub depth: f64,
    pub area: f64,
    pub volume: f64,
}

impl RoomBounds {
    /// Bounding box of a point set; all zeros when empty
    pub fn from_points(points: &[Point3<f64>]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };

        let (min, max) = points.iter().fold((*first, *first), |(mut lo, mut hi), p| {
            lo.x = lo.x.min(p.x);
            lo.y = lo.y.min(p.y);
            lo.z = lo.z.min(p.z);
            hi.x = hi.x.max(p.x);
            hi.y = hi.y.max(p.y);
            hi.z = hi.z.max(p.z);
            (lo, hi)
        });

        let width = max.x - min.x;
        let height = max.y - min.y;
        let depth = max.z - min.z;

        Self {
            min,
            max,
            width,
            height,
            depth,
            area: width * depth,
            volume: width * height * depth,
        }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_extents() {
        let pts = vec![
            Point3::new(-2.0, 0.0, -1.5),
            Point3::new(2.0, 2.5, 1.5),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = RoomBounds::from_points(&pts);
        assert_relative_eq!(b.width, 4.0);
        assert_relative_eq!(b.height, 2.5);
        assert_relative_eq!(b.depth, 3.0);
        assert_relative_eq!(b.area, 12.0);
        assert_relative_eq!(b.volume, 30.0);
        assert_relative_eq!(b.center(), Point3::new(0.0, 1.25, 0.0));
    }

    #[test]
    fn test_empty() {
        let b = RoomBounds::from_points(&[]);
        assert_eq!(b, RoomBounds::default());
    }
}
