//! TLE acquisition.
//!
//! Fetches element listings from CelesTrak (or a file, or memory), picks the
//! requested satellite by name, and keeps the last good pair for a fixed
//! time-to-live. When nothing usable can be obtained the built-in last-known
//! ISS pair is handed out, so the propagation core always receives
//! syntactically valid lines.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{ParseError, SourceError};
use crate::tle::{find_record, ChecksumPolicy, OrbitalElementSet, TleRecord};

pub const CELESTRAK_STATIONS_URL: &str = "https://celestrak.org/NORAD/elements/stations.txt";
pub const DEFAULT_SATELLITE: &str = "ISS (ZARYA)";
pub const DEFAULT_TTL_SECS: i64 = 3600;

pub const FALLBACK_LINE1: &str = "1 25544U 98067A   24017.54519514  .00016149  00000+0  29290-3 0  9993";
pub const FALLBACK_LINE2: &str = "2 25544  51.6415 158.8530 0005786 244.1866 179.9192 15.49622591435056";

pub fn fallback_record() -> TleRecord {
    TleRecord {
        name: DEFAULT_SATELLITE.to_string(),
        line1: FALLBACK_LINE1.to_string(),
        line2: FALLBACK_LINE2.to_string(),
    }
}

/// Anything that can produce the text of a TLE listing.
pub trait TleSource {
    fn fetch_text(&self) -> Result<String, SourceError>;

    fn describe(&self) -> String;
}

pub struct CelestrakSource {
    url: String,
    agent: ureq::Agent,
}

impl CelestrakSource {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl TleSource for CelestrakSource {
    fn fetch_text(&self) -> Result<String, SourceError> {
        let response = self.agent
            .get(&self.url)
            .call()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        response.into_string()
            .map_err(|e| SourceError::Read(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

pub struct FileSource(pub PathBuf);

impl TleSource for FileSource {
    fn fetch_text(&self) -> Result<String, SourceError> {
        std::fs::read_to_string(&self.0).map_err(|e| SourceError::Read(format!("{}: {}", self.0.display(), e)))
    }

    fn describe(&self) -> String {
        self.0.display().to_string()
    }
}

/// Fixed listing held in memory.
pub struct StaticSource(pub String);

impl TleSource for StaticSource {
    fn fetch_text(&self) -> Result<String, SourceError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "in-memory listing".to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TleOrigin {
    Fresh,
    Cached,
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AcquiredTle {
    pub record: TleRecord,
    pub origin: TleOrigin,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl AcquiredTle {
    pub fn fallback() -> Self {
        Self { record: fallback_record(), origin: TleOrigin::Fallback, fetched_at: None }
    }

    /// Named element set for this record. The built-in pair is always read
    /// leniently: its line 2 checksum digit is known to be wrong.
    pub fn elements(&self, policy: ChecksumPolicy) -> Result<OrbitalElementSet, ParseError> {
        let policy = match self.origin {
            TleOrigin::Fallback => ChecksumPolicy::Lenient,
            _ => policy,
        };
        Ok(OrbitalElementSet::parse(&self.record.line1, &self.record.line2, policy)?
            .with_name(self.record.name.clone()))
    }
}

#[derive(Clone, Debug)]
struct CachedTle {
    record: TleRecord,
    fetched_at: DateTime<Utc>,
}

/// Last good record and when it was fetched.
#[derive(Clone, Debug)]
pub struct TleCache {
    ttl: Duration,
    entry: Option<CachedTle>,
}

impl TleCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn fresh(&self, now: DateTime<Utc>) -> Option<(&TleRecord, DateTime<Utc>)> {
        self.entry
            .as_ref()
            .filter(|c| now - c.fetched_at < self.ttl && now >= c.fetched_at)
            .map(|c| (&c.record, c.fetched_at))
    }

    /// The cached record regardless of age.
    pub fn any(&self) -> Option<(&TleRecord, DateTime<Utc>)> {
        self.entry.as_ref().map(|c| (&c.record, c.fetched_at))
    }

    pub fn store(&mut self, record: TleRecord, now: DateTime<Utc>) {
        self.entry = Some(CachedTle { record, fetched_at: now });
    }
}

pub struct TleProvider<S> {
    source: S,
    satellite: String,
    policy: ChecksumPolicy,
    cache: TleCache,
}

impl<S: TleSource> TleProvider<S> {
    pub fn new(source: S, satellite: impl Into<String>, ttl: Duration) -> Self {
        Self {
            source,
            satellite: satellite.into(),
            policy: ChecksumPolicy::default(),
            cache: TleCache::new(ttl),
        }
    }

    /// Checksum policy a fetched record must pass before it is cached.
    pub fn with_checksum(mut self, policy: ChecksumPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn satellite(&self) -> &str {
        &self.satellite
    }

    /// Record to use at `now`: cached while fresh, otherwise refetched;
    /// on failure the stale cache, then the built-in pair. Never fails.
    pub fn current(&mut self, now: DateTime<Utc>) -> AcquiredTle {
        if let Some((record, fetched_at)) = self.cache.fresh(now) {
            log::debug!("using cached TLE for {} from {}", self.satellite, fetched_at);
            return AcquiredTle { record: record.clone(), origin: TleOrigin::Cached, fetched_at: Some(fetched_at) };
        }

        match self.fetch() {
            Ok(record) => {
                log::info!("fetched TLE for {} from {}", record.name, self.source.describe());
                self.cache.store(record.clone(), now);
                AcquiredTle { record, origin: TleOrigin::Fresh, fetched_at: Some(now) }
            }
            Err(e) => {
                log::warn!("TLE fetch for {} failed: {}", self.satellite, e);
                if let Some((record, fetched_at)) = self.cache.any() {
                    log::warn!("reusing TLE fetched at {}", fetched_at);
                    AcquiredTle { record: record.clone(), origin: TleOrigin::Cached, fetched_at: Some(fetched_at) }
                } else {
                    log::warn!("using built-in fallback TLE");
                    AcquiredTle::fallback()
                }
            }
        }
    }

    fn fetch(&self) -> Result<TleRecord, SourceError> {
        let text = self.source.fetch_text()?;
        let record = find_record(&text, &self.satellite)?;
        OrbitalElementSet::parse(&record.line1, &record.line2, self.policy)?;
        Ok(record)
    }
}
