//! Projection of TEME state vectors onto the Earth.
//!
//! The inertial position is rotated by GMST into the Earth-fixed frame
//! (sidereal rotation only; precession, nutation and polar motion are not
//! modelled) and then inverted to geodetic coordinates on the chosen
//! [`EarthModel`]. Observer-relative look angles go through the local
//! south/east/zenith frame.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::earth::EarthModel;
use crate::math::{rotate, rotation_z, sez_matrix};
use crate::propagator::StateVector;
use crate::time::greenwich_mean_sidereal_time;

/// Earth rotation rate, rad/s.
pub const EARTH_ROTATION_RAD_S: f64 = 7.292115e-5;
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Below this the horizontal component is treated as zero and azimuth is 0.
const HORIZONTAL_EPS_KM: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub at: DateTime<Utc>,
    /// Degrees in [-90, 90].
    pub latitude: f64,
    /// Degrees in (-180, 180].
    pub longitude: f64,
    pub altitude_km: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_km: f64,
}

impl ObserverLocation {
    pub fn new(latitude: f64, longitude: f64, altitude_km: f64) -> Self {
        Self { latitude, longitude, altitude_km }
    }

    /// Earth-fixed position of the observer, km.
    pub fn ecef(&self, model: EarthModel) -> Vector3<f64> {
        geodetic_to_ecef(self.latitude, self.longitude, self.altitude_km, model)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookAngles {
    /// Degrees clockwise from north, [0, 360).
    pub azimuth: f64,
    /// Degrees above the local horizontal.
    pub elevation: f64,
    pub range_km: f64,
    /// Positive when the satellite is receding.
    pub range_rate_km_s: f64,
}

impl LookAngles {
    pub fn is_above_horizon(&self) -> bool {
        self.elevation > 0.0
    }

    /// Doppler offset seen at the observer for a carrier at `freq_hz`.
    pub fn doppler_shift_hz(&self, freq_hz: f64) -> f64 {
        -freq_hz * self.range_rate_km_s / SPEED_OF_LIGHT_KM_S
    }
}

/// Maps any longitude in degrees into (-180, 180].
pub fn normalize_longitude(deg: f64) -> f64 {
    let l = (deg + 180.0).rem_euclid(360.0) - 180.0;
    if l <= -180.0 { l + 360.0 } else { l }
}

pub fn teme_to_ecef(state: &StateVector) -> Vector3<f64> {
    rotate(state.position, &rotation_z(greenwich_mean_sidereal_time(state.at)))
}

/// Earth-fixed velocity, including the frame's own rotation.
pub fn teme_to_ecef_velocity(state: &StateVector) -> Vector3<f64> {
    let rot = rotation_z(greenwich_mean_sidereal_time(state.at));
    let r = rotate(state.position, &rot);
    let v = rotate(state.velocity, &rot);
    Vector3::new(
        v.x + EARTH_ROTATION_RAD_S * r.y,
        v.y - EARTH_ROTATION_RAD_S * r.x,
        v.z,
    )
}

pub fn geodetic_to_ecef(lat_deg: f64, lon_deg: f64, alt_km: f64, model: EarthModel) -> Vector3<f64> {
    let a = model.equatorial_radius_km();
    let e2 = model.eccentricity_sq();
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    Vector3::new(
        (n + alt_km) * cos_lat * cos_lon,
        (n + alt_km) * cos_lat * sin_lon,
        (n * (1.0 - e2) + alt_km) * sin_lat,
    )
}

/// Inverse of [`geodetic_to_ecef`]: latitude, longitude (degrees) and height (km).
pub fn ecef_to_geodetic(ecef: &Vector3<f64>, model: EarthModel) -> (f64, f64, f64) {
    let a = model.equatorial_radius_km();
    let e2 = model.eccentricity_sq();
    let p = ecef.x.hypot(ecef.y);
    let longitude = normalize_longitude(ecef.y.atan2(ecef.x).to_degrees());

    let mut lat = ecef.z.atan2(p);
    let mut c = 1.0;
    if e2 > 0.0 {
        for _ in 0..10 {
            let phi = lat;
            c = 1.0 / (1.0 - e2 * phi.sin() * phi.sin()).sqrt();
            lat = (ecef.z + a * c * e2 * phi.sin()).atan2(p);
            if (lat - phi).abs() < 1e-12 {
                break;
            }
        }
        c = 1.0 / (1.0 - e2 * lat.sin() * lat.sin()).sqrt();
    }

    let altitude = if lat.cos() > 1e-9 {
        p / lat.cos() - a * c
    } else {
        ecef.z.abs() - model.polar_radius_km()
    };
    (lat.to_degrees().clamp(-90.0, 90.0), longitude, altitude)
}

/// Subpoint on the WGS-84 ellipsoid.
pub fn to_geodetic(state: &StateVector) -> GeodeticPoint {
    to_geodetic_with(state, EarthModel::Wgs84)
}

pub fn to_geodetic_with(state: &StateVector, model: EarthModel) -> GeodeticPoint {
    let (latitude, longitude, altitude_km) = ecef_to_geodetic(&teme_to_ecef(state), model);
    GeodeticPoint { at: state.at, latitude, longitude, altitude_km }
}

pub fn to_look_angles(state: &StateVector, observer: &ObserverLocation) -> LookAngles {
    to_look_angles_with(state, observer, EarthModel::Wgs84)
}

pub fn to_look_angles_with(state: &StateVector, observer: &ObserverLocation, model: EarthModel) -> LookAngles {
    let sat = teme_to_ecef(state);
    let sat_vel = teme_to_ecef_velocity(state);
    let range = sat - observer.ecef(model);
    let range_km = range.norm();

    let sez = sez_matrix(observer.latitude.to_radians(), observer.longitude.to_radians()) * range;
    let horizontal = sez.x.hypot(sez.y);
    let azimuth = if horizontal < HORIZONTAL_EPS_KM {
        0.0
    } else {
        let az = sez.y.atan2(-sez.x).to_degrees().rem_euclid(360.0);
        if az >= 360.0 { 0.0 } else { az }
    };
    let elevation = sez.z.atan2(horizontal).to_degrees();
    let range_rate_km_s = if range_km > 0.0 { range.dot(&sat_vel) / range_km } else { 0.0 };

    LookAngles { azimuth, elevation, range_km, range_rate_km_s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::TimeZone;

    /// Builds a state whose Earth-fixed position is `ecef` at `at`.
    fn state_at(ecef: Vector3<f64>, at: DateTime<Utc>) -> StateVector {
        let back = rotation_z(greenwich_mean_sidereal_time(at)).transpose() * ecef;
        StateVector { at, position: [back.x, back.y, back.z], velocity: [0.0, 0.0, 0.0] }
    }

    fn when() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 17, 13, 5, 4).unwrap()
    }

    #[test]
    fn longitude_normalization() {
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_abs_diff_eq!(normalize_longitude(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(725.5), 5.5, epsilon = 1e-9);
        assert_eq!(normalize_longitude(0.0), 0.0);
    }

    #[test]
    fn geodetic_round_trip_on_ellipsoid() {
        for &(lat, lon, alt) in &[(52.23, 21.01, 0.1), (-33.9, 151.2, 420.0), (0.0, 180.0, 35786.0), (89.5, -45.0, 800.0)] {
            let ecef = geodetic_to_ecef(lat, lon, alt, EarthModel::Wgs84);
            let (lat2, lon2, alt2) = ecef_to_geodetic(&ecef, EarthModel::Wgs84);
            assert_abs_diff_eq!(lat2, lat, epsilon = 1e-8);
            assert_abs_diff_eq!(lon2, lon, epsilon = 1e-8);
            assert_abs_diff_eq!(alt2, alt, epsilon = 1e-6);
        }
    }

    #[test]
    fn poles_resolve_without_nan() {
        for z in [6778.0, -6778.0] {
            let (lat, lon, alt) = ecef_to_geodetic(&Vector3::new(0.0, 0.0, z), EarthModel::Wgs84);
            assert_eq!(lat, 90.0_f64.copysign(z));
            assert_eq!(lon, 0.0);
            assert_relative_eq!(alt, 6778.0 - EarthModel::Wgs84.polar_radius_km(), epsilon = 1e-9);
        }
    }

    #[test]
    fn spherical_model_uses_geocentric_latitude() {
        let ecef = Vector3::new(5000.0, 0.0, 5000.0);
        let (lat, lon, alt) = ecef_to_geodetic(&ecef, EarthModel::Spherical);
        assert_relative_eq!(lat, 45.0, epsilon = 1e-12);
        assert_eq!(lon, 0.0);
        assert_relative_eq!(alt, 5000.0 * 2f64.sqrt() - 6371.0, epsilon = 1e-9);
    }

    #[test]
    fn subpoint_undoes_sidereal_rotation() {
        let t = when();
        let ecef = geodetic_to_ecef(10.0, -100.0, 400.0, EarthModel::Wgs84);
        let p = to_geodetic(&state_at(ecef, t));
        assert_abs_diff_eq!(p.latitude, 10.0, epsilon = 1e-8);
        assert_abs_diff_eq!(p.longitude, -100.0, epsilon = 1e-8);
        assert_abs_diff_eq!(p.altitude_km, 400.0, epsilon = 1e-6);
        assert_eq!(p.at, t);
    }

    #[test]
    fn satellite_overhead_is_at_zenith() {
        let t = when();
        let observer = ObserverLocation::new(52.23, 21.01, 0.1);
        let ecef = geodetic_to_ecef(52.23, 21.01, 420.0, EarthModel::Wgs84);
        let look = to_look_angles(&state_at(ecef, t), &observer);
        assert_relative_eq!(look.elevation, 90.0, epsilon = 1e-6);
        assert_eq!(look.azimuth, 0.0);
        assert_relative_eq!(look.range_km, 419.9, epsilon = 1e-6);
        assert!(look.is_above_horizon());
    }

    #[test]
    fn azimuth_follows_compass() {
        let t = when();
        let observer = ObserverLocation::new(0.0, 0.0, 0.0);
        let cases = [((5.0, 0.0), 0.0), ((0.0, 5.0), 90.0), ((-5.0, 0.0), 180.0), ((0.0, -5.0), 270.0)];
        for ((lat, lon), expected) in cases {
            let ecef = geodetic_to_ecef(lat, lon, 500.0, EarthModel::Wgs84);
            let look = to_look_angles(&state_at(ecef, t), &observer);
            let off = (look.azimuth - expected + 540.0).rem_euclid(360.0) - 180.0;
            assert!(off.abs() < 1e-6, "expected {expected}, got {}", look.azimuth);
            assert!((0.0..360.0).contains(&look.azimuth));
            assert!(look.elevation > 0.0);
        }
    }

    #[test]
    fn antipodal_satellite_is_below_horizon() {
        let t = when();
        let observer = ObserverLocation::new(40.0, -75.0, 0.0);
        let ecef = geodetic_to_ecef(-40.0, 105.0, 420.0, EarthModel::Wgs84);
        let look = to_look_angles(&state_at(ecef, t), &observer);
        assert!(look.elevation < -80.0);
        assert!(!look.is_above_horizon());
    }

    #[test]
    fn earth_fixed_point_has_zero_range_rate() {
        let t = when();
        let ecef = geodetic_to_ecef(0.0, 30.0, 35786.0, EarthModel::Wgs84);
        let mut s = state_at(ecef, t);
        // Inertial velocity of a point co-rotating with the Earth.
        let omega = Vector3::new(0.0, 0.0, EARTH_ROTATION_RAD_S);
        let v = omega.cross(&Vector3::from(s.position));
        s.velocity = [v.x, v.y, v.z];
        assert_abs_diff_eq!(teme_to_ecef_velocity(&s).norm(), 0.0, epsilon = 1e-9);
        let look = to_look_angles(&s, &ObserverLocation::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(look.range_rate_km_s, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn doppler_sign() {
        let look = LookAngles { azimuth: 0.0, elevation: 10.0, range_km: 1000.0, range_rate_km_s: -7.0 };
        let shift = look.doppler_shift_hz(145.8e6);
        assert!(shift > 3000.0 && shift < 3500.0, "{shift}");
    }
}
