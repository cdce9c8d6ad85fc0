//! Frame rotations.
//!
//! Matrix operations for the TEME -> Earth-fixed rotation and the
//! Earth-fixed -> topocentric (south, east, zenith) basis change.

use nalgebra::{Matrix3, Vector3};

/// Frame rotation about the polar axis: components of a fixed vector seen
/// from axes turned by `angle` (radians, counter-clockwise from above).
pub fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, s, 0.0,
        -s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

/// Earth-fixed -> south/east/zenith basis at geodetic `lat`, `lon` (radians).
pub fn sez_matrix(lat: f64, lon: f64) -> Matrix3<f64> {
    let (sl, cl) = lat.sin_cos();
    let (sn, cn) = lon.sin_cos();
    Matrix3::new(
        sl * cn, sl * sn, -cl,
        -sn, cn, 0.0,
        cl * cn, cl * sn, sl,
    )
}

pub fn rotate(v: [f64; 3], rot: &Matrix3<f64>) -> Vector3<f64> {
    rot * Vector3::from(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotation_z_quarter_turn() {
        let v = rotate([1.0, 0.0, 0.0], &rotation_z(FRAC_PI_2));
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn sez_is_orthonormal() {
        let m = sez_matrix(0.7, -2.1);
        let mmt = m * m.transpose();
        assert_relative_eq!(mmt, Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(m.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn sez_zenith_points_up() {
        let up = rotate([0.0, 0.0, 1.0], &sez_matrix(FRAC_PI_2, 0.0));
        assert_relative_eq!(up.z, 1.0, epsilon = 1e-12);
    }
}
