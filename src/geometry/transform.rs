// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Rotation matrix helpers

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Orthogonality and determinant slack for deck-supplied rotation matrices,
/// which rarely carry more than five significant figures.
pub const ROTATION_TOLERANCE: f64 = 1e-4;

/// Convert a matrix of angles in degrees to direction cosines, entry by entry.
pub fn degrees_to_cosines(rotation: &Matrix3<f64>) -> Matrix3<f64> {
    rotation.map(|entry| entry.to_radians().cos())
}

/// Check that a matrix is a proper rotation: orthogonal with determinant +1.
pub fn is_rotation(rotation: &Matrix3<f64>) -> bool {
    let residual = rotation * rotation.transpose() - Matrix3::identity();
    residual.norm() < ROTATION_TOLERANCE
        && (rotation.determinant() - 1.0).abs() < ROTATION_TOLERANCE
}

/// Rotation matrix that carries the +z axis onto `direction`.
pub fn align_z_to(direction: &Vector3<f64>) -> Matrix3<f64> {
    match Rotation3::rotation_between(&Vector3::z(), direction) {
        Some(rotation) => rotation.into_inner(),
        // Antiparallel direction: a half-turn about x flips z.
        None => Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degrees_to_cosines() {
        let angles = Matrix3::new(0.0, 90.0, 90.0, 90.0, 0.0, 90.0, 90.0, 90.0, 0.0);
        let cosines = degrees_to_cosines(&angles);
        assert_relative_eq!(cosines, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_is_rotation() {
        assert!(is_rotation(&Matrix3::identity()));
        assert!(is_rotation(
            &Rotation3::from_euler_angles(0.3, -1.1, 2.0).into_inner()
        ));
        assert!(!is_rotation(&(2.0 * Matrix3::identity())));
        // Orthogonal but orientation-reversing.
        let mirror = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, -1.0);
        assert!(!is_rotation(&mirror));
    }

    #[test]
    fn test_align_z_to() {
        let direction = Vector3::new(3.0, 0.0, 4.0).normalize();
        let rotation = align_z_to(&direction);
        assert_relative_eq!(rotation * Vector3::z(), direction, epsilon = 1e-12);
        assert!(is_rotation(&rotation));
    }

    #[test]
    fn test_align_z_to_antiparallel() {
        let rotation = align_z_to(&Vector3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(
            rotation * Vector3::z(),
            Vector3::new(0.0, 0.0, -1.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-12);
    }
}
