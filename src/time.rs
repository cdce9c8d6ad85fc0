//! Time and sidereal-angle calculations.
//!
//! Provides Greenwich Mean Sidereal Time (GMST), the Earth rotation angle used
//! to carry TEME positions into the Earth-fixed frame, and minute offsets
//! relative to an element-set epoch.

use chrono::{DateTime, Utc};

pub const SECONDS_PER_DAY: f64 = 86400.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;
pub const GMST_BASE_DEG: f64 = 280.46061837;
pub const GMST_ROTATION_PER_DAY: f64 = 360.98564736629;
pub const GMST_CORRECTION: f64 = 0.000387933;

/// Unix time of J2000.0 (2000-01-01T12:00:00Z) in milliseconds.
const J2000_UNIX_MS: i64 = 946_728_000_000;

/// Days (fractional) elapsed since J2000.0.
pub fn days_since_j2000(timestamp: DateTime<Utc>) -> f64 {
    (timestamp.timestamp_millis() - J2000_UNIX_MS) as f64 / (1000.0 * SECONDS_PER_DAY)
}

/// GMST in radians, normalized to [0, 2π).
pub fn greenwich_mean_sidereal_time(timestamp: DateTime<Utc>) -> f64 {
    let days = days_since_j2000(timestamp);
    let centuries = days / DAYS_PER_JULIAN_CENTURY;
    let gmst_degrees = GMST_BASE_DEG
        + GMST_ROTATION_PER_DAY * days
        + GMST_CORRECTION * centuries * centuries
        - centuries * centuries * centuries / 38710000.0;
    gmst_degrees.rem_euclid(360.0).to_radians()
}

/// Signed minutes from `epoch` to `instant`, the argument SGP4 expects.
pub fn minutes_since(epoch: DateTime<Utc>, instant: DateTime<Utc>) -> f64 {
    (instant - epoch).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn gmst_at_j2000() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(days_since_j2000(t), 0.0);
        assert_abs_diff_eq!(greenwich_mean_sidereal_time(t).to_degrees(), GMST_BASE_DEG, epsilon = 1e-9);
    }

    #[test]
    fn gmst_advances_one_sidereal_turn_per_day() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 17, 0, 0, 0).unwrap();
        let t1 = t0 + chrono::Duration::days(1);
        let d = (greenwich_mean_sidereal_time(t1) - greenwich_mean_sidereal_time(t0)).to_degrees();
        assert_abs_diff_eq!(d.rem_euclid(360.0), 0.98564736629, epsilon = 1e-6);
    }

    #[test]
    fn gmst_stays_in_range() {
        let t0 = Utc.with_ymd_and_hms(1998, 6, 3, 7, 11, 0).unwrap();
        for h in 0..200 {
            let g = greenwich_mean_sidereal_time(t0 + chrono::Duration::hours(h * 7));
            assert!((0.0..std::f64::consts::TAU).contains(&g));
        }
    }

    #[test]
    fn minute_offsets_are_signed() {
        let epoch = Utc.with_ymd_and_hms(2024, 1, 17, 13, 0, 0).unwrap();
        assert_abs_diff_eq!(minutes_since(epoch, epoch + chrono::Duration::seconds(90)), 1.5);
        assert_abs_diff_eq!(minutes_since(epoch, epoch - chrono::Duration::hours(2)), -120.0);
    }
}
