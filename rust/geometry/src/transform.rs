// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rigid transforms between wall-local frames and the room frame.
//!
//! The room frame is gravity aligned with `+Y` up, so every rotation used
//! while stitching is a yaw about `Y`.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Rotation followed by translation (`p' = R p + t`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub isometry: Isometry3<f64>,
}

impl RigidTransform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            isometry: Isometry3::identity(),
        }
    }

    /// Build from a rotation matrix and translation
    pub fn from_parts(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            isometry: Isometry3::from_parts(
                Translation3::from(translation),
                UnitQuaternion::from_rotation_matrix(&rotation),
            ),
        }
    }

    /// Yaw about the room up axis (`+Y`), then translate
    pub fn from_yaw_translation(yaw: f64, translation: Vector3<f64>) -> Self {
        Self::from_parts(Rotation3::from_axis_angle(&Vector3::y_axis(), yaw), translation)
    }

    #[inline]
    pub fn rotation(&self) -> Rotation3<f64> {
        self.isometry.rotation.to_rotation_matrix()
    }

    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        self.isometry.translation.vector
    }

    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.isometry.transform_point(p)
    }

    #[inline]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.isometry.transform_vector(v)
    }

    /// Apply `self`, then `other`
    pub fn then(&self, other: &RigidTransform) -> Self {
        Self {
            isometry: other.isometry * self.isometry,
        }
    }

    /// Replace the translation so that the rotated `source` points land on
    /// `target` in the least-squares sense.
    ///
    /// With the rotation fixed the optimum is closed form:
    /// `t = mean(target_i - R source_i)`. Returns `None` when the slices are
    /// empty or of different length.
    pub fn align_translation(
        rotation: Rotation3<f64>,
        source: &[Point3<f64>],
        target: &[Point3<f64>],
    ) -> Option<Self> {
        if source.is_empty() || source.len() != target.len() {
            return None;
        }
        let sum = source
            .iter()
            .zip(target)
            .fold(Vector3::zeros(), |acc, (s, d)| acc + (d.coords - rotation * s.coords));
        Some(Self::from_parts(rotation, sum / source.len() as f64))
    }

    /// Root-mean-square distance between transformed `source` and `target`
    pub fn rms_error(&self, source: &[Point3<f64>], target: &[Point3<f64>]) -> f64 {
        if source.is_empty() {
            return 0.0;
        }
        let sq: f64 = source
            .iter()
            .zip(target)
            .map(|(s, d)| (self.transform_point(s) - d).norm_squared())
            .sum();
        (sq / source.len() as f64).sqrt()
    }

    /// Row-major 4x4 homogeneous matrix
    pub fn to_matrix(&self) -> [[f64; 4]; 4] {
        let m = self.isometry.to_homogeneous();
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
        out
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Signed rotation about `up` that takes the horizontal part of `from`
/// onto the horizontal part of `to`, in radians `(-π, π]`.
///
/// Positive means counter-clockwise when looking down from `+up`.
pub fn signed_yaw(from: &Vector3<f64>, to: &Vector3<f64>, up: &Vector3<f64>) -> f64 {
    let a = from - up * up.dot(from);
    let b = to - up * up.dot(to);
    let sin = a.cross(&b).dot(up);
    let cos = a.dot(&b);
    sin.atan2(cos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_yaw_rotates_about_up() {
        let t = RigidTransform::from_yaw_translation(FRAC_PI_2, Vector3::zeros());
        // +Y up, yaw +90° takes +Z to +X
        let v = t.transform_vector(&Vector3::z());
        assert_relative_eq!(v, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_align_translation_exact() {
        let rot = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.3);
        let shift = Vector3::new(1.0, -0.5, 2.0);
        let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 2.5, 0.0)];
        let target: Vec<_> = source.iter().map(|p| rot * p + shift).collect();

        let t = RigidTransform::align_translation(rot, &source, &target).unwrap();
        assert_relative_eq!(t.translation(), shift, epsilon = 1e-12);
        assert_relative_eq!(t.rms_error(&source, &target), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_align_translation_averages_residuals() {
        let rot = Rotation3::identity();
        let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        let target = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 1.0, 0.0)];
        let t = RigidTransform::align_translation(rot, &source, &target).unwrap();
        assert_relative_eq!(t.translation(), Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(t.rms_error(&source, &target), 1.0);

        assert!(RigidTransform::align_translation(rot, &[], &[]).is_none());
    }

    #[test]
    fn test_compose() {
        let a = RigidTransform::from_yaw_translation(0.4, Vector3::new(1.0, 0.0, 0.0));
        let b = RigidTransform::from_yaw_translation(-1.1, Vector3::new(0.0, 2.0, 3.0));
        let p = Point3::new(0.3, -0.2, 1.5);

        let ab = a.then(&b);
        assert_relative_eq!(
            ab.transform_point(&p),
            b.transform_point(&a.transform_point(&p)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_signed_yaw_direction() {
        let up = Vector3::y();
        assert_relative_eq!(signed_yaw(&Vector3::z(), &Vector3::x(), &up), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(signed_yaw(&Vector3::x(), &Vector3::z(), &up), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_matrix_layout() {
        let t = RigidTransform::from_yaw_translation(0.0, Vector3::new(1.0, 2.0, 3.0));
        let m = t.to_matrix();
        assert_eq!(m[0][3], 1.0);
        assert_eq!(m[1][3], 2.0);
        assert_eq!(m[2][3], 3.0);
        assert_eq!(m[3][3], 1.0);
    }
}
