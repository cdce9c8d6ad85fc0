//! Error kinds for parsing, propagation, TLE acquisition and configuration.
//!
//! Each failure domain gets its own enum so callers can branch on the kind
//! (hide the marker, show a banner, retry with a fresher TLE) instead of
//! matching on message text.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line} is {len} characters long, expected {} or {expected}", .expected - 1)]
    WrongLength { line: u8, len: usize, expected: usize },

    #[error("line {line} must start with '{line}'")]
    BadLineNumber { line: u8 },

    #[error("catalog numbers differ between lines ({first} vs {second})")]
    CatalogMismatch { first: String, second: String },

    #[error("line {line}: cannot read {field} from {value:?}")]
    BadField { line: u8, field: &'static str, value: String },

    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("line {line}: checksum is {found}, computed {expected}")]
    Checksum { line: u8, expected: u8, found: u8 },

    #[error("SGP4 rejected the element set: {0}")]
    Sgp4(String),

    #[error("no element set named {0:?} in the TLE source")]
    NameNotFound(String),

    #[error("a TLE record needs two element lines")]
    MissingLines,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("SGP4 propagation failed: {0}")]
    Sgp4(String),

    #[error("orbit decayed: radius {radius_km:.1} km is below the Earth's surface")]
    Decayed { radius_km: f64 },

    #[error("propagation produced a non-finite state")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
