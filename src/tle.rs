//! Two-Line Element (TLE) parsing.
//!
//! Validates the fixed-column layout, ranges and checksums of an element
//! pair, then initializes SGP4 constants from it. Malformed input is rejected
//! here so propagation only ever sees a usable element set. Also splits
//! multi-record (name line + two element lines) text into records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sgp4::Constants;

use crate::earth::{EARTH_MU, EARTH_RADIUS_KM};
use crate::error::ParseError;
use crate::time::SECONDS_PER_DAY;

pub const LINE_LEN: usize = 69;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    /// Mismatches are logged and the digit is recomputed.
    #[default]
    Lenient,
    Strict,
}

/// A name line with its two element lines, as found in a CelesTrak listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TleRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Parsed, immutable element set plus the SGP4 constants derived from it.
#[derive(Clone, Debug)]
pub struct OrbitalElementSet {
    pub name: Option<String>,
    pub catalog_number: u32,
    pub classification: char,
    pub international_designator: String,
    pub epoch: DateTime<Utc>,
    /// First derivative of mean motion / 2, rev/day².
    pub mean_motion_dot: f64,
    /// Second derivative of mean motion / 6, rev/day³.
    pub mean_motion_ddot: f64,
    pub drag_term: f64,
    pub element_set_number: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    /// Revolutions per day.
    pub mean_motion: f64,
    pub revolution_number: u32,
    line1: String,
    line2: String,
    constants: Constants,
}

impl OrbitalElementSet {
    pub fn parse(line1: &str, line2: &str, policy: ChecksumPolicy) -> Result<Self, ParseError> {
        let line1 = normalize_line(line1, 1, policy)?;
        let line2 = normalize_line(line2, 2, policy)?;

        let catalog_1 = field(&line1, 3, 7).trim();
        let catalog_2 = field(&line2, 3, 7).trim();
        if catalog_1 != catalog_2 {
            return Err(ParseError::CatalogMismatch {
                first: catalog_1.to_string(),
                second: catalog_2.to_string(),
            });
        }
        let catalog_number = parse_int(&line1, 1, 3, 7, "catalog number")?;
        let classification = line1.as_bytes()[7] as char;
        let international_designator = field(&line1, 10, 17).trim().to_string();

        let epoch_year = parse_int(&line1, 1, 19, 20, "epoch year")?;
        let epoch_day = parse_float(&line1, 1, 21, 32, "epoch day")?;
        let full_year = epoch_year as i32 + if epoch_year < 57 { 2000 } else { 1900 };
        let days_in_year = if NaiveDate::from_ymd_opt(full_year, 2, 29).is_some() { 366.0 } else { 365.0 };
        if !(1.0..days_in_year + 1.0).contains(&epoch_day) {
            return Err(ParseError::OutOfRange { field: "epoch day", value: epoch_day });
        }

        let mean_motion_dot = parse_float(&line1, 1, 34, 43, "mean motion derivative")?;
        let mean_motion_ddot = parse_assumed_decimal(&line1, 1, 45, 52, "mean motion second derivative")?;
        let drag_term = parse_assumed_decimal(&line1, 1, 54, 61, "drag term")?;
        let element_set_number = parse_optional_int(&line1, 1, 65, 68, "element set number")?;

        let inclination_deg = parse_float(&line2, 2, 9, 16, "inclination")?;
        let raan_deg = parse_float(&line2, 2, 18, 25, "right ascension")?;
        let eccentricity = parse_leading_decimal(&line2, 2, 27, 33, "eccentricity")?;
        let arg_perigee_deg = parse_float(&line2, 2, 35, 42, "argument of perigee")?;
        let mean_anomaly_deg = parse_float(&line2, 2, 44, 51, "mean anomaly")?;
        let mean_motion = parse_float(&line2, 2, 53, 63, "mean motion")?;
        let revolution_number = parse_optional_int(&line2, 2, 64, 68, "revolution number")?;

        check_range("inclination", inclination_deg, 0.0, 180.0, true)?;
        check_range("right ascension", raan_deg, 0.0, 360.0, false)?;
        check_range("eccentricity", eccentricity, 0.0, 1.0, false)?;
        check_range("argument of perigee", arg_perigee_deg, 0.0, 360.0, false)?;
        check_range("mean anomaly", mean_anomaly_deg, 0.0, 360.0, false)?;
        if !(mean_motion > 0.0 && mean_motion.is_finite()) {
            return Err(ParseError::OutOfRange { field: "mean motion", value: mean_motion });
        }

        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| ParseError::Sgp4(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| ParseError::Sgp4(e.to_string()))?;

        Ok(Self {
            name: None,
            catalog_number,
            classification,
            international_designator,
            epoch: elements.datetime.and_utc(),
            mean_motion_dot,
            mean_motion_ddot,
            drag_term,
            element_set_number,
            inclination_deg,
            raan_deg,
            eccentricity,
            arg_perigee_deg,
            mean_anomaly_deg,
            mean_motion,
            revolution_number,
            line1,
            line2,
            constants,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// The element lines as handed to SGP4 (trimmed, checksum digit settled).
    pub fn lines(&self) -> (&str, &str) {
        (&self.line1, &self.line2)
    }

    pub fn period_minutes(&self) -> f64 {
        SECONDS_PER_DAY / 60.0 / self.mean_motion
    }

    pub fn mean_altitude_km(&self) -> f64 {
        mean_motion_to_altitude_km(self.mean_motion)
    }
}

/// Parses an element pair, tolerating checksum mismatches.
pub fn initialize(line1: &str, line2: &str) -> Result<OrbitalElementSet, ParseError> {
    OrbitalElementSet::parse(line1, line2, ChecksumPolicy::Lenient)
}

pub fn mean_motion_to_altitude_km(n_revs_per_day: f64) -> f64 {
    let n_rad_s = n_revs_per_day * 2.0 * std::f64::consts::PI / SECONDS_PER_DAY;
    let a = (EARTH_MU / (n_rad_s * n_rad_s)).powf(1.0 / 3.0);
    a - EARTH_RADIUS_KM
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// minus signs count one.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(LINE_LEN - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Splits text into name + element-line records. Blank lines are dropped and
/// lines trimmed; stray lines that do not start a record are skipped.
pub fn parse_records(data: &str) -> Vec<TleRecord> {
    let lines: Vec<&str> = data.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut records = Vec::new();

    let mut i = 0;
    while i + 2 < lines.len() {
        let (name, line1, line2) = (lines[i], lines[i + 1], lines[i + 2]);
        if !line1.starts_with('1') || !line2.starts_with('2') {
            i += 1;
            continue;
        }
        records.push(TleRecord {
            name: name.to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        });
        i += 3;
    }
    records
}

/// Finds the first name line containing `name` and returns the two lines
/// after it.
pub fn find_record(data: &str, name: &str) -> Result<TleRecord, ParseError> {
    let lines: Vec<&str> = data.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let idx = lines
        .iter()
        .position(|l| l.contains(name))
        .ok_or_else(|| ParseError::NameNotFound(name.to_string()))?;
    match (lines.get(idx + 1), lines.get(idx + 2)) {
        (Some(line1), Some(line2)) => Ok(TleRecord {
            name: lines[idx].to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        }),
        _ => Err(ParseError::MissingLines),
    }
}

fn normalize_line(raw: &str, number: u8, policy: ChecksumPolicy) -> Result<String, ParseError> {
    let line = raw.trim();
    if !line.is_ascii() || line.len() < LINE_LEN - 1 || line.len() > LINE_LEN {
        return Err(ParseError::WrongLength { line: number, len: line.chars().count(), expected: LINE_LEN });
    }
    if line.as_bytes()[0] != b'0' + number {
        return Err(ParseError::BadLineNumber { line: number });
    }

    let expected = checksum(line);
    let body = &line[..LINE_LEN - 1];
    match line.as_bytes().get(LINE_LEN - 1) {
        Some(&c) if c == b'0' + expected => Ok(line.to_string()),
        Some(&c) if c.is_ascii_digit() && policy == ChecksumPolicy::Lenient => {
            log::warn!("TLE line {} checksum {} does not match computed {}", number, c - b'0', expected);
            Ok(format!("{}{}", body, expected))
        }
        Some(&c) if c.is_ascii_digit() => Err(ParseError::Checksum { line: number, expected, found: c - b'0' }),
        Some(_) => Err(ParseError::BadField { line: number, field: "checksum", value: line[LINE_LEN - 1..].to_string() }),
        None => Ok(format!("{}{}", body, expected)),
    }
}

/// 1-based inclusive column range, as TLE documentation numbers them.
fn field(line: &str, start: usize, end: usize) -> &str {
    &line[start - 1..end.min(line.len())]
}

fn parse_float(line: &str, number: u8, start: usize, end: usize, name: &'static str) -> Result<f64, ParseError> {
    let raw = field(line, start, end).trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::BadField { line: number, field: name, value: raw.to_string() })
}

fn parse_int(line: &str, number: u8, start: usize, end: usize, name: &'static str) -> Result<u32, ParseError> {
    let raw = field(line, start, end).trim();
    raw.parse::<u32>()
        .map_err(|_| ParseError::BadField { line: number, field: name, value: raw.to_string() })
}

/// Counters some producers leave blank; blank reads as zero.
fn parse_optional_int(line: &str, number: u8, start: usize, end: usize, name: &'static str) -> Result<u32, ParseError> {
    if field(line, start, end).trim().is_empty() {
        return Ok(0);
    }
    parse_int(line, number, start, end, name)
}

/// Digits with an implied leading decimal point (`0005786` is 0.0005786).
fn parse_leading_decimal(line: &str, number: u8, start: usize, end: usize, name: &'static str) -> Result<f64, ParseError> {
    let raw = field(line, start, end).trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::BadField { line: number, field: name, value: raw.to_string() });
    }
    format!("0.{}", raw)
        .parse::<f64>()
        .map_err(|_| ParseError::BadField { line: number, field: name, value: raw.to_string() })
}

/// Fields written as `[sign]ddddd[sign]d`, meaning ±0.ddddd × 10^±d.
fn parse_assumed_decimal(line: &str, number: u8, start: usize, end: usize, name: &'static str) -> Result<f64, ParseError> {
    let raw = field(line, start, end).trim();
    let bad = || ParseError::BadField { line: number, field: name, value: raw.to_string() };
    if raw.len() < 3 {
        return Err(bad());
    }
    let (mantissa, exponent) = raw.split_at(raw.len() - 2);
    let (sign, digits) = match mantissa.as_bytes().first() {
        Some(b'-') => (-1.0, &mantissa[1..]),
        Some(b'+') => (1.0, &mantissa[1..]),
        _ => (1.0, mantissa),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let exponent: i32 = exponent.parse().map_err(|_| bad())?;
    let mantissa: f64 = format!("0.{}", digits).parse().map_err(|_| bad())?;
    Ok(sign * mantissa * 10f64.powi(exponent))
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64, max_inclusive: bool) -> Result<(), ParseError> {
    let ok = value >= min && if max_inclusive { value <= max } else { value < max };
    if ok { Ok(()) } else { Err(ParseError::OutOfRange { field: name, value }) }
}
