//! Earth figure models used when projecting onto the surface.
//!
//! WGS-84 gives geodetic latitude and ellipsoidal height; the spherical model
//! is the reduced-accuracy option and reports geocentric latitude.

use serde::{Deserialize, Serialize};

/// Mean radius used for decay checks and the spherical model.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const EARTH_MU: f64 = 398600.4418;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarthModel {
    #[default]
    Wgs84,
    Spherical,
}

impl EarthModel {
    pub fn label(&self) -> &'static str {
        match self {
            EarthModel::Wgs84 => "WGS-84",
            EarthModel::Spherical => "Spherical",
        }
    }

    pub fn equatorial_radius_km(&self) -> f64 {
        match self {
            EarthModel::Wgs84 => 6378.137,
            EarthModel::Spherical => EARTH_RADIUS_KM,
        }
    }

    pub fn flattening(&self) -> f64 {
        match self {
            EarthModel::Wgs84 => 1.0 / 298.257223563,
            EarthModel::Spherical => 0.0,
        }
    }

    /// Square of the first eccentricity, `f * (2 - f)`.
    pub fn eccentricity_sq(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    pub fn polar_radius_km(&self) -> f64 {
        self.equatorial_radius_km() * (1.0 - self.flattening())
    }
}
