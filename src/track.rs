//! Ground-track assembly.
//!
//! Samples the subpoint over a window centred on an instant and stitches the
//! samples into a polyline. A [`TrackSample::Break`] is inserted wherever two
//! consecutive longitudes differ by more than the break threshold, so a line
//! renderer does not draw across the whole map at the antimeridian. The
//! comparison is the raw difference of normalized longitudes, not the
//! shorter-arc distance.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::earth::EarthModel;
use crate::projector::{to_geodetic_with, GeodeticPoint};
use crate::propagator::propagate;
use crate::tle::OrbitalElementSet;

pub const DEFAULT_HALF_WINDOW_MINS: i64 = 50;
pub const DEFAULT_STEP_SECS: i64 = 60;
pub const DEFAULT_BREAK_THRESHOLD_DEG: f64 = 180.0;
/// Upper bound on samples in one window.
pub const MAX_TRACK_SAMPLES: usize = 50_000;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackSample {
    Point(GeodeticPoint),
    Break,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroundTrack {
    pub samples: Vec<TrackSample>,
}

impl GroundTrack {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &GeodeticPoint> {
        self.samples.iter().filter_map(|s| match s {
            TrackSample::Point(p) => Some(p),
            TrackSample::Break => None,
        })
    }

    pub fn point_count(&self) -> usize {
        self.points().count()
    }

    pub fn break_count(&self) -> usize {
        self.samples.iter().filter(|s| matches!(s, TrackSample::Break)).count()
    }

    /// Continuous runs of points between breaks.
    pub fn segments(&self) -> Vec<Vec<GeodeticPoint>> {
        self.samples
            .split(|s| matches!(s, TrackSample::Break))
            .map(|run| {
                run.iter()
                    .filter_map(|s| match s {
                        TrackSample::Point(p) => Some(*p),
                        TrackSample::Break => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|seg| !seg.is_empty())
            .collect()
    }

    /// Latitude and longitude columns with `None` at each break, the shape
    /// plotting libraries take for gapped lines.
    pub fn columns(&self) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        self.samples
            .iter()
            .map(|s| match s {
                TrackSample::Point(p) => (Some(p.latitude), Some(p.longitude)),
                TrackSample::Break => (None, None),
            })
            .unzip()
    }
}

/// Sampling window: `[center - half_window, center + half_window)` every `step`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackWindow {
    pub half_window: Duration,
    pub step: Duration,
    pub break_threshold_deg: f64,
}

impl Default for TrackWindow {
    fn default() -> Self {
        Self {
            half_window: Duration::minutes(DEFAULT_HALF_WINDOW_MINS),
            step: Duration::seconds(DEFAULT_STEP_SECS),
            break_threshold_deg: DEFAULT_BREAK_THRESHOLD_DEG,
        }
    }
}

impl TrackWindow {
    /// Empty when the step is not positive, the window would exceed
    /// [`MAX_TRACK_SAMPLES`], or its ends fall outside the representable range.
    pub fn instants(&self, center: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        if self.step <= Duration::zero() {
            log::warn!("track step {} is not positive, no samples", self.step);
            return Vec::new();
        }
        let count = self
            .half_window
            .num_milliseconds()
            .checked_mul(2)
            .map(|span| span / self.step.num_milliseconds().max(1));
        if !count.is_some_and(|n| (0..=MAX_TRACK_SAMPLES as i64).contains(&n)) {
            log::warn!("track window {} at step {} is too large, no samples", self.half_window, self.step);
            return Vec::new();
        }
        let (Some(mut t), Some(end)) = (
            center.checked_sub_signed(self.half_window),
            center.checked_add_signed(self.half_window),
        ) else {
            log::warn!("track window around {} is out of range, no samples", center);
            return Vec::new();
        };
        let mut out = Vec::new();
        while t < end {
            out.push(t);
            match t.checked_add_signed(self.step) {
                Some(next) => t = next,
                None => break,
            }
        }
        out
    }

    pub fn build(&self, elements: &OrbitalElementSet, center: DateTime<Utc>, model: EarthModel) -> GroundTrack {
        let mut failed = 0usize;
        let points = self.instants(center).into_iter().filter_map(|t| match propagate(elements, t) {
            Ok(state) => Some(to_geodetic_with(&state, model)),
            Err(e) => {
                log::debug!("omitting track sample at {}: {}", t, e);
                failed += 1;
                None
            }
        });
        let track = assemble(points, self.break_threshold_deg);
        if failed > 0 {
            log::info!("ground track built with {} samples omitted", failed);
        }
        track
    }
}

/// Ground track around `center` on the WGS-84 ellipsoid with the default break threshold.
pub fn build_track(
    elements: &OrbitalElementSet,
    center: DateTime<Utc>,
    half_window: Duration,
    step: Duration,
) -> GroundTrack {
    TrackWindow { half_window, step, ..TrackWindow::default() }.build(elements, center, EarthModel::Wgs84)
}

/// Stitches chronologically ordered points, inserting a break before any
/// point whose longitude jumps by more than `threshold_deg`.
pub fn assemble<I>(points: I, threshold_deg: f64) -> GroundTrack
where
    I: IntoIterator<Item = GeodeticPoint>,
{
    let mut samples = Vec::new();
    let mut prev_lon: Option<f64> = None;
    for p in points {
        if let Some(prev) = prev_lon {
            if (p.longitude - prev).abs() > threshold_deg {
                samples.push(TrackSample::Break);
            }
        }
        prev_lon = Some(p.longitude);
        samples.push(TrackSample::Point(p));
    }
    GroundTrack { samples }
}
