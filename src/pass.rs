use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::earth::EarthModel;
use crate::projector::{to_look_angles_with, ObserverLocation};
use crate::propagator::propagate;
use crate::tle::OrbitalElementSet;

const BISECT_ITERATIONS: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Pass {
    pub aos: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub max_elevation: f64,
    pub max_elevation_at: DateTime<Utc>,
    pub aos_azimuth: f64,
    pub los_azimuth: f64,
}

impl Pass {
    pub fn duration(&self) -> Duration {
        self.los - self.aos
    }
}

struct Visibility<'a> {
    elements: &'a OrbitalElementSet,
    observer: &'a ObserverLocation,
    model: EarthModel,
}

impl Visibility<'_> {
    /// `(elevation, azimuth)` in degrees, `None` when propagation fails.
    fn look(&self, t: DateTime<Utc>) -> Option<(f64, f64)> {
        let state = propagate(self.elements, t).ok()?;
        let look = to_look_angles_with(&state, self.observer, self.model);
        Some((look.elevation, look.azimuth))
    }

    fn visible(&self, t: DateTime<Utc>) -> bool {
        self.look(t).is_some_and(|(el, _)| el > 0.0)
    }

    /// Narrows the horizon crossing between `below` and `above`, which may
    /// be in either time order.
    fn bisect(&self, below: DateTime<Utc>, above: DateTime<Utc>) -> DateTime<Utc> {
        let (mut lo, mut hi) = (below, above);
        for _ in 0..BISECT_ITERATIONS {
            let mid = lo + (hi - lo) / 2;
            if self.visible(mid) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo + (hi - lo) / 2
    }
}

/// Passes of the satellite above the observer's horizon in `[start, start + window]`.
///
/// Coarse scan every `step`, then each horizon crossing is refined by
/// bisection. A pass already in progress at `start` gets `aos = start`; one
/// still in progress at the end of the window is closed there.
pub fn predict_passes(
    elements: &OrbitalElementSet,
    observer: &ObserverLocation,
    start: DateTime<Utc>,
    window: Duration,
    step: Duration,
    model: EarthModel,
) -> Vec<Pass> {
    if step <= Duration::zero() || window < Duration::zero() {
        return Vec::new();
    }
    let vis = Visibility { elements, observer, model };
    let end = start + window;

    struct Tracker {
        in_pass: bool,
        aos: DateTime<Utc>,
        aos_azimuth: f64,
        max_elev: f64,
        max_at: DateTime<Utc>,
        prev_t: DateTime<Utc>,
    }
    let mut tracker = Tracker {
        in_pass: false,
        aos: start,
        aos_azimuth: 0.0,
        max_elev: f64::MIN,
        max_at: start,
        prev_t: start,
    };

    let mut passes = Vec::new();
    let mut t = start;
    let mut first = true;
    loop {
        let look = vis.look(t).filter(|(el, _)| *el > 0.0);
        match look {
            Some((elev, _)) => {
                if !tracker.in_pass {
                    tracker.in_pass = true;
                    tracker.aos = if first { t } else { vis.bisect(tracker.prev_t, t) };
                    tracker.aos_azimuth = vis.look(tracker.aos).map_or(0.0, |(_, az)| az);
                    tracker.max_elev = elev;
                    tracker.max_at = t;
                } else if elev > tracker.max_elev {
                    tracker.max_elev = elev;
                    tracker.max_at = t;
                }
            }
            None if tracker.in_pass => {
                let los = vis.bisect(t, tracker.prev_t);
                log::debug!("pass {} -> {}, max elevation {:.1}", tracker.aos, los, tracker.max_elev);
                passes.push(Pass {
                    aos: tracker.aos,
                    los,
                    max_elevation: tracker.max_elev,
                    max_elevation_at: tracker.max_at,
                    aos_azimuth: tracker.aos_azimuth,
                    los_azimuth: vis.look(los).map_or(0.0, |(_, az)| az),
                });
                tracker.in_pass = false;
            }
            None => {}
        }
        tracker.prev_t = t;
        first = false;
        if t >= end {
            break;
        }
        t = (t + step).min(end);
    }

    if tracker.in_pass {
        passes.push(Pass {
            aos: tracker.aos,
            los: end,
            max_elevation: tracker.max_elev,
            max_elevation_at: tracker.max_at,
            aos_azimuth: tracker.aos_azimuth,
            los_azimuth: vis.look(end).map_or(0.0, |(_, az)| az),
        });
    }

    passes.sort_by_key(|p| p.aos);
    passes
}
