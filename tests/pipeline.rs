use approx::assert_abs_diff_eq;
use chrono::{Duration, TimeZone, Utc};

use orbtrack::config::TrackerConfig;
use orbtrack::earth::EarthModel;
use orbtrack::error::ParseError;
use orbtrack::projector::{to_geodetic, to_look_angles, ObserverLocation};
use orbtrack::propagator::propagate;
use orbtrack::snapshot::{snapshot, SnapshotRequest, TrackCache};
use orbtrack::source::{StaticSource, TleOrigin, TleProvider, FALLBACK_LINE1, FALLBACK_LINE2};
use orbtrack::tle::{initialize, ChecksumPolicy, OrbitalElementSet};
use orbtrack::track::{build_track, TrackSample};

fn iss() -> OrbitalElementSet {
    initialize(FALLBACK_LINE1, FALLBACK_LINE2).unwrap()
}

#[test]
fn golden_subpoint_at_epoch() {
    let e = iss();
    let expected = Utc.with_ymd_and_hms(2024, 1, 17, 13, 5, 4).unwrap() + Duration::milliseconds(860);
    assert_eq!((e.epoch - expected).num_milliseconds(), 0);

    let state = propagate(&e, e.epoch).unwrap();
    assert!((6600.0..6900.0).contains(&state.radius_km()));

    let p = to_geodetic(&state);
    // Two-body estimate from the same mean elements.
    assert_abs_diff_eq!(p.latitude, 45.0, epsilon = 0.6);
    assert_abs_diff_eq!(p.longitude, -101.9, epsilon = 0.6);
    assert_abs_diff_eq!(p.altitude_km, 425.0, epsilon = 25.0);

    assert_abs_diff_eq!(p.latitude, 45.008687024, epsilon = 1e-6);
    assert_abs_diff_eq!(p.longitude, -101.948706838, epsilon = 1e-6);
    assert_abs_diff_eq!(p.altitude_km, 426.287860, epsilon = 1e-5);
}

#[test]
fn golden_subpoint_is_reproducible() {
    let t = Utc.with_ymd_and_hms(2024, 1, 18, 0, 0, 0).unwrap();
    let a = to_geodetic(&propagate(&iss(), t).unwrap());
    let b = to_geodetic(&propagate(&iss(), t).unwrap());
    assert_eq!(a, b);
}

#[test]
fn every_subpoint_is_normalized() {
    let e = iss();
    let mut t = e.epoch - Duration::days(2);
    while t < e.epoch + Duration::days(2) {
        let p = to_geodetic(&propagate(&e, t).unwrap());
        assert!(p.longitude > -180.0 && p.longitude <= 180.0, "{t}: lon {}", p.longitude);
        assert!((-90.0..=90.0).contains(&p.latitude), "{t}: lat {}", p.latitude);
        t += Duration::seconds(397);
    }
}

#[test]
fn default_track_has_hundred_samples() {
    let e = iss();
    let track = build_track(&e, e.epoch, Duration::minutes(50), Duration::seconds(60));
    assert_eq!(track.point_count(), 100);
    for pair in track.samples.windows(2) {
        if let [TrackSample::Point(a), TrackSample::Point(b)] = pair {
            assert!((b.longitude - a.longitude).abs() <= 180.0);
        }
    }
}

#[test]
fn corrupted_tle_is_rejected() {
    let truncated = &FALLBACK_LINE1[..40];
    assert!(matches!(initialize(truncated, FALLBACK_LINE2), Err(ParseError::WrongLength { line: 1, .. })));

    let garbled = FALLBACK_LINE2.replace("51.6415", "5x.6415");
    assert!(matches!(initialize(FALLBACK_LINE1, &garbled), Err(ParseError::BadField { line: 2, .. })));

    assert!(matches!(initialize(FALLBACK_LINE2, FALLBACK_LINE1), Err(ParseError::BadLineNumber { line: 1 })));
    assert!(initialize("", "").is_err());
}

#[test]
fn fallback_pair_fails_strict_checksum() {
    assert!(matches!(
        OrbitalElementSet::parse(FALLBACK_LINE1, FALLBACK_LINE2, ChecksumPolicy::Strict),
        Err(ParseError::Checksum { line: 2, .. })
    ));
}

#[test]
fn listing_to_snapshot() {
    let listing = format!("\n  ISS (ZARYA)  \n{}\n{}\n\n", FALLBACK_LINE1, FALLBACK_LINE2);
    let at = Utc.with_ymd_and_hms(2024, 1, 17, 18, 30, 0).unwrap();
    let config = TrackerConfig::default();

    let mut provider = TleProvider::new(StaticSource(listing), config.satellite_name.clone(), config.tle_ttl());
    let acquired = provider.current(at);
    assert_eq!(acquired.origin, TleOrigin::Fresh);

    let elements = OrbitalElementSet::parse(&acquired.record.line1, &acquired.record.line2, config.checksum)
        .unwrap()
        .with_name(acquired.record.name.clone());
    let observer = ObserverLocation::new(52.2297, 21.0122, 0.1);
    let req = SnapshotRequest {
        at,
        window: config.track_window(),
        model: config.earth_model,
        observer: Some(observer),
        origin: acquired.origin,
    };
    let mut cache = TrackCache::default();
    let snap = snapshot(&elements, &req, Some(&mut cache));

    assert_eq!(snap.satellite, "ISS (ZARYA)");
    let position = snap.position.unwrap();
    let direct = to_geodetic(&propagate(&elements, at).unwrap());
    assert_eq!(position, direct);
    let look = snap.look_angles.unwrap();
    let direct_look = to_look_angles(&propagate(&elements, at).unwrap(), &observer);
    assert_abs_diff_eq!(look.elevation, direct_look.elevation, epsilon = 1e-12);
    assert_eq!(snap.track.point_count(), 100);
}

#[test]
fn spherical_model_differs_slightly_from_wgs84() {
    let e = iss();
    let state = propagate(&e, e.epoch + Duration::minutes(20)).unwrap();
    let ellipsoid = orbtrack::projector::to_geodetic_with(&state, EarthModel::Wgs84);
    let sphere = orbtrack::projector::to_geodetic_with(&state, EarthModel::Spherical);
    assert_abs_diff_eq!(ellipsoid.longitude, sphere.longitude, epsilon = 1e-9);
    assert!((ellipsoid.latitude - sphere.latitude).abs() < 0.25);
}
