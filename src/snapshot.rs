//! What the display layer consumes: current subpoint, ground track and
//! optional look angles, bundled with where the elements came from.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::earth::EarthModel;
use crate::pass::Pass;
use crate::projector::{to_geodetic_with, to_look_angles_with, GeodeticPoint, LookAngles, ObserverLocation};
use crate::propagator::propagate;
use crate::source::TleOrigin;
use crate::tle::OrbitalElementSet;
use crate::track::{GroundTrack, TrackWindow};

pub const DEFAULT_BUCKET_SECS: i64 = 60;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub satellite: String,
    pub norad_id: u32,
    pub epoch: DateTime<Utc>,
    pub at: DateTime<Utc>,
    /// `None` when the satellite cannot be placed at `at`.
    pub position: Option<GeodeticPoint>,
    pub altitude_km: Option<f64>,
    pub track: GroundTrack,
    pub look_angles: Option<LookAngles>,
    pub tle_origin: TleOrigin,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub passes: Vec<Pass>,
}

#[derive(Clone, Copy, Debug)]
pub struct SnapshotRequest {
    pub at: DateTime<Utc>,
    pub window: TrackWindow,
    pub model: EarthModel,
    pub observer: Option<ObserverLocation>,
    pub origin: TleOrigin,
}

/// Builds a snapshot. With a cache the track is centred on the start of the
/// bucket containing `at` and shared by every request in that bucket;
/// without one it is centred on `at` itself.
pub fn snapshot(elements: &OrbitalElementSet, req: &SnapshotRequest, cache: Option<&mut TrackCache>) -> Snapshot {
    let position = match propagate(elements, req.at) {
        Ok(state) => Some((to_geodetic_with(&state, req.model), state)),
        Err(e) => {
            log::warn!("position of {} unavailable at {}: {}", display_name(elements), req.at, e);
            None
        }
    };

    let look_angles = match (&position, &req.observer) {
        (Some((_, state)), Some(observer)) => Some(to_look_angles_with(state, observer, req.model)),
        _ => None,
    };

    let track = match cache {
        Some(cache) => cache.track(elements, req.at, &req.window, req.model),
        None => req.window.build(elements, req.at, req.model),
    };

    let position = position.map(|(p, _)| p);
    Snapshot {
        satellite: display_name(elements),
        norad_id: elements.catalog_number,
        epoch: elements.epoch,
        at: req.at,
        altitude_km: position.map(|p| p.altitude_km),
        position,
        track,
        look_angles,
        tle_origin: req.origin,
        passes: Vec::new(),
    }
}

fn display_name(elements: &OrbitalElementSet) -> String {
    elements.name.clone().unwrap_or_else(|| elements.catalog_number.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct TrackKey {
    tle_hash: u64,
    bucket: i64,
    model: EarthModel,
    half_window_ms: i64,
    step_ms: i64,
    threshold_bits: u64,
}

/// Caller-owned memo of ground tracks keyed by TLE and time bucket.
///
/// Only the bucket of the latest request is retained, whichever way time moves.
#[derive(Debug)]
pub struct TrackCache {
    bucket_secs: i64,
    entries: HashMap<TrackKey, GroundTrack>,
    hits: u64,
    misses: u64,
}

impl Default for TrackCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_BUCKET_SECS))
    }
}

impl TrackCache {
    pub fn new(bucket: Duration) -> Self {
        Self {
            bucket_secs: bucket.num_seconds().max(1),
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn track(
        &mut self,
        elements: &OrbitalElementSet,
        at: DateTime<Utc>,
        window: &TrackWindow,
        model: EarthModel,
    ) -> GroundTrack {
        let bucket = at.timestamp().div_euclid(self.bucket_secs);
        let key = TrackKey {
            tle_hash: tle_hash(elements),
            bucket,
            model,
            half_window_ms: window.half_window.num_milliseconds(),
            step_ms: window.step.num_milliseconds(),
            threshold_bits: window.break_threshold_deg.to_bits(),
        };

        if let Some(track) = self.entries.get(&key) {
            self.hits += 1;
            return track.clone();
        }

        self.misses += 1;
        let center = DateTime::from_timestamp(bucket * self.bucket_secs, 0).unwrap_or(at);
        let track = window.build(elements, center, model);
        self.entries.retain(|k, _| k.bucket == bucket);
        self.entries.insert(key, track.clone());
        log::debug!("cached ground track for bucket {} ({} entries)", bucket, self.entries.len());
        track
    }
}

fn tle_hash(elements: &OrbitalElementSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    elements.lines().hash(&mut hasher);
    hasher.finish()
}
