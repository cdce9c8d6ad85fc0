//! Tracker configuration.
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below, which reproduce the classic ISS dashboard behaviour.

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::earth::EarthModel;
use crate::error::ConfigError;
use crate::projector::ObserverLocation;
use crate::snapshot::DEFAULT_BUCKET_SECS;
use crate::source::{CELESTRAK_STATIONS_URL, DEFAULT_SATELLITE, DEFAULT_TTL_SECS};
use crate::tle::ChecksumPolicy;
use crate::track::{
    TrackWindow, DEFAULT_BREAK_THRESHOLD_DEG, DEFAULT_HALF_WINDOW_MINS, DEFAULT_STEP_SECS, MAX_TRACK_SAMPLES,
};

pub const MAX_HALF_WINDOW_MINS: i64 = 7 * 24 * 60;
pub const MAX_STEP_SECS: i64 = 24 * 3600;
pub const MAX_TTL_SECS: i64 = 30 * 24 * 3600;
pub const MAX_BUCKET_SECS: i64 = 24 * 3600;

/// Observer used by the binary when neither the flag nor the file gives one.
pub const DEFAULT_OBSERVER: ObserverLocation = ObserverLocation {
    latitude: 52.2297,
    longitude: 21.0122,
    altitude_km: 0.1,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub satellite_name: String,
    pub source_url: String,
    pub fetch_timeout_secs: u64,
    pub tle_ttl_secs: i64,
    pub track_half_window_mins: i64,
    pub track_step_secs: i64,
    pub break_threshold_deg: f64,
    pub cache_bucket_secs: i64,
    pub earth_model: EarthModel,
    pub checksum: ChecksumPolicy,
    pub observer: Option<ObserverLocation>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            satellite_name: DEFAULT_SATELLITE.to_string(),
            source_url: CELESTRAK_STATIONS_URL.to_string(),
            fetch_timeout_secs: 10,
            tle_ttl_secs: DEFAULT_TTL_SECS,
            track_half_window_mins: DEFAULT_HALF_WINDOW_MINS,
            track_step_secs: DEFAULT_STEP_SECS,
            break_threshold_deg: DEFAULT_BREAK_THRESHOLD_DEG,
            cache_bucket_secs: DEFAULT_BUCKET_SECS,
            earth_model: EarthModel::default(),
            checksum: ChecksumPolicy::default(),
            observer: None,
        }
    }
}

impl TrackerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.satellite_name.trim().is_empty() {
            return Err(ConfigError::Invalid("satellite_name is empty".into()));
        }
        if self.track_step_secs <= 0 {
            return Err(ConfigError::Invalid(format!("track_step_secs must be positive, got {}", self.track_step_secs)));
        }
        if self.track_step_secs > MAX_STEP_SECS {
            return Err(ConfigError::Invalid(format!(
                "track_step_secs must be at most {}, got {}",
                MAX_STEP_SECS, self.track_step_secs
            )));
        }
        if !(0..=MAX_HALF_WINDOW_MINS).contains(&self.track_half_window_mins) {
            return Err(ConfigError::Invalid(format!(
                "track_half_window_mins must be in [0, {}], got {}",
                MAX_HALF_WINDOW_MINS, self.track_half_window_mins
            )));
        }
        let samples = 2 * self.track_half_window_mins * 60 / self.track_step_secs;
        if samples > MAX_TRACK_SAMPLES as i64 {
            return Err(ConfigError::Invalid(format!(
                "track window of {} samples exceeds {}",
                samples, MAX_TRACK_SAMPLES
            )));
        }
        if !(self.break_threshold_deg > 0.0 && self.break_threshold_deg <= 360.0) {
            return Err(ConfigError::Invalid(format!(
                "break_threshold_deg must be in (0, 360], got {}",
                self.break_threshold_deg
            )));
        }
        if !(0..=MAX_TTL_SECS).contains(&self.tle_ttl_secs) {
            return Err(ConfigError::Invalid(format!(
                "tle_ttl_secs must be in [0, {}], got {}",
                MAX_TTL_SECS, self.tle_ttl_secs
            )));
        }
        if !(1..=MAX_BUCKET_SECS).contains(&self.cache_bucket_secs) {
            return Err(ConfigError::Invalid(format!(
                "cache_bucket_secs must be in [1, {}], got {}",
                MAX_BUCKET_SECS, self.cache_bucket_secs
            )));
        }
        if let Some(obs) = &self.observer {
            if !(-90.0..=90.0).contains(&obs.latitude) || !(-180.0..=180.0).contains(&obs.longitude) {
                return Err(ConfigError::Invalid(format!(
                    "observer at ({}, {}) is off the globe",
                    obs.latitude, obs.longitude
                )));
            }
        }
        Ok(())
    }

    /// Durations are clamped to the validated bounds, so an unvalidated
    /// config never overflows.
    pub fn track_window(&self) -> TrackWindow {
        TrackWindow {
            half_window: Duration::minutes(self.track_half_window_mins.clamp(0, MAX_HALF_WINDOW_MINS)),
            step: Duration::seconds(self.track_step_secs.clamp(-MAX_STEP_SECS, MAX_STEP_SECS)),
            break_threshold_deg: self.break_threshold_deg,
        }
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn tle_ttl(&self) -> Duration {
        Duration::seconds(self.tle_ttl_secs.clamp(0, MAX_TTL_SECS))
    }

    pub fn cache_bucket(&self) -> Duration {
        Duration::seconds(self.cache_bucket_secs.clamp(1, MAX_BUCKET_SECS))
    }
}
