//! Small geometric kernel shared by the whole crate.
//!
//! Everything here is a thin layer over nalgebra: angle reductions,
//! shortest-arc distances, oriented angles and the rotation/projection
//! helpers used by the holders and the pseudo-axis engines.

use nalgebra::{Unit as NUnit, UnitQuaternion, Vector3};
use std::f64::consts::PI;

use crate::constants::DPI;

/// Reduce an angle into the symmetric range [-π, π).
pub fn angle_restrict_symm(angle: f64) -> f64 {
    let r = angle.rem_euclid(DPI);
    if r >= PI {
        r - DPI
    } else {
        r
    }
}

/// Reduce an angle into the positive range [0, 2π).
pub fn angle_restrict_pos(angle: f64) -> f64 {
    angle.rem_euclid(DPI)
}

/// Shortest-arc distance between two angles, in [0, π].
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(DPI);
    d.min(DPI - d)
}

/// Angle between two vectors, in [0, π].
///
/// The scalar product is clamped before the `acos` so that vectors which
/// are parallel up to rounding do not produce a NaN.
pub fn vector_angle(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let cos = a.dot(b) / (a.norm() * b.norm());
    cos.clamp(-1.0, 1.0).acos()
}

/// Oriented angle from `a` to `b` around `axis`, in (-π, π].
///
/// The sign follows the right-hand rule around `axis`; both input vectors
/// are expected to be non null and not collinear with `axis`.
pub fn oriented_angle(a: &Vector3<f64>, b: &Vector3<f64>, axis: &Vector3<f64>) -> f64 {
    let n = axis.normalize();
    let cross = a.cross(b);
    f64::atan2(cross.dot(&n) / (a.norm() * b.norm()), a.dot(b) / (a.norm() * b.norm()))
}

/// Projection of `v` onto the plane of normal `normal`.
pub fn project_on_plane(v: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let n = normal.normalize();
    v - n * v.dot(&n)
}

/// Quaternion rotating by `angle` around `axis` (right-hand rule).
///
/// A null axis yields the identity rotation.
pub fn quaternion_from_axis_angle(axis: &Vector3<f64>, angle: f64) -> UnitQuaternion<f64> {
    match NUnit::try_new(*axis, 0.0) {
        Some(u) => UnitQuaternion::from_axis_angle(&u, angle),
        None => UnitQuaternion::identity(),
    }
}

/// Rotate `v` by `angle` around the axis `axis` passing through `origin`.
pub fn rotate_around_axis(
    v: &Vector3<f64>,
    axis: &Vector3<f64>,
    origin: &Vector3<f64>,
    angle: f64,
) -> Vector3<f64> {
    let q = quaternion_from_axis_angle(axis, angle);
    origin + q * (v - origin)
}

/// True when any component of the slice is NaN.
pub fn any_nan(x: &[f64]) -> bool {
    x.iter().any(|v| v.is_nan())
}

#[cfg(test)]
mod algebra_test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_angle_restrict_symm() {
        assert_relative_eq!(angle_restrict_symm(0.0), 0.0);
        assert_relative_eq!(angle_restrict_symm(3.0 * PI), -PI);
        assert_relative_eq!(angle_restrict_symm(-PI), -PI);
        assert_relative_eq!(angle_restrict_symm(PI + 0.1), -PI + 0.1, epsilon = 1e-12);
        assert_relative_eq!(angle_restrict_symm(-5.0 * FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_restrict_pos() {
        assert_relative_eq!(angle_restrict_pos(-FRAC_PI_2), 3.0 * FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(angle_restrict_pos(5.0 * PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_distance() {
        assert_relative_eq!(angle_distance(0.1, -0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(angle_distance(PI - 0.05, -PI + 0.05), 0.1, epsilon = 1e-12);
        assert_relative_eq!(angle_distance(0.0, 2.0 * PI), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_oriented_angle() {
        let x = Vector3::x();
        let y = Vector3::y();
        let z = Vector3::z();
        assert_relative_eq!(oriented_angle(&x, &y, &z), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(oriented_angle(&y, &x, &z), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_project_on_plane() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let p = project_on_plane(&v, &Vector3::z());
        assert_relative_eq!(p, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_around_axis_with_origin() {
        // quarter turn around the z axis through (1, 0, 0)
        let v = Vector3::new(2.0, 0.0, 0.0);
        let r = rotate_around_axis(&v, &Vector3::z(), &Vector3::x(), FRAC_PI_2);
        assert_relative_eq!(r, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
