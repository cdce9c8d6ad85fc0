//! SGP4 propagation of an element set to an arbitrary instant.
//!
//! Output is in the TEME inertial frame (km, km/s). Each call is a pure
//! function of the element set and the instant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::earth::EARTH_RADIUS_KM;
use crate::error::PropagationError;
use crate::time::minutes_since;
use crate::tle::OrbitalElementSet;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StateVector {
    pub at: DateTime<Utc>,
    /// TEME position, km.
    pub position: [f64; 3],
    /// TEME velocity, km/s.
    pub velocity: [f64; 3],
}

impl StateVector {
    pub fn radius_km(&self) -> f64 {
        norm(self.position)
    }

    pub fn speed_km_s(&self) -> f64 {
        norm(self.velocity)
    }
}

pub fn propagate(elements: &OrbitalElementSet, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
    let minutes = minutes_since(elements.epoch, instant);
    let prediction = elements
        .constants()
        .propagate(sgp4::MinutesSinceEpoch(minutes))
        .map_err(|e| PropagationError::Sgp4(e.to_string()))?;

    let state = StateVector {
        at: instant,
        position: prediction.position,
        velocity: prediction.velocity,
    };
    if !state.position.iter().chain(state.velocity.iter()).all(|v| v.is_finite()) {
        return Err(PropagationError::NonFinite);
    }
    let radius_km = state.radius_km();
    if radius_km <= EARTH_RADIUS_KM {
        return Err(PropagationError::Decayed { radius_km });
    }
    Ok(state)
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FALLBACK_LINE1, FALLBACK_LINE2};
    use crate::tle::initialize;
    use chrono::Duration;

    fn iss() -> OrbitalElementSet {
        initialize(FALLBACK_LINE1, FALLBACK_LINE2).unwrap()
    }

    #[test]
    fn radius_at_epoch_is_leo() {
        let e = iss();
        let s = propagate(&e, e.epoch).unwrap();
        let r = s.radius_km();
        assert!((6600.0..6900.0).contains(&r), "radius {r}");
        let v = s.speed_km_s();
        assert!((7.5..7.9).contains(&v), "speed {v}");
        assert_eq!(s.at, e.epoch);
    }

    #[test]
    fn propagation_is_deterministic() {
        let e = iss();
        let t = e.epoch + Duration::minutes(437) + Duration::milliseconds(250);
        assert_eq!(propagate(&e, t).unwrap(), propagate(&e, t).unwrap());
    }

    #[test]
    fn works_before_and_after_epoch() {
        let e = iss();
        for hours in [-48, -6, 6, 48] {
            let s = propagate(&e, e.epoch + Duration::hours(hours)).unwrap();
            assert!((6600.0..6900.0).contains(&s.radius_km()), "{hours}h: {}", s.radius_km());
        }
    }

    #[test]
    fn far_from_epoch_never_yields_subsurface_state() {
        let e = iss();
        for days in [365, 3650, -3650] {
            match propagate(&e, e.epoch + Duration::days(days)) {
                Ok(s) => assert!(s.radius_km() > EARTH_RADIUS_KM),
                Err(err) => assert!(!err.to_string().is_empty()),
            }
        }
    }
}
