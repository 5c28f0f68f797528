use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

/// Norms below this are treated as zero-length vectors.
pub const DEGENERACY_EPS: f64 = 1e-10;

/// Matrix `[u]x` such that `[u]x * w == u.cross(&w)`.
#[inline]
pub fn skew(u: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -u.z, u.y, u.z, 0.0, -u.x, -u.y, u.x, 0.0)
}

/// Jacobian of `v / |v|` with respect to `v`.
#[inline]
pub fn normalization_jacobian(unit: &Vector3<f64>, norm: f64) -> Matrix3<f64> {
    (Matrix3::identity() - unit * unit.transpose()) / norm
}

/// Maps an angle into `(-pi, pi]`.
#[inline]
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

/// Angle at the vertex between two vectors, in radians.
#[inline]
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}
