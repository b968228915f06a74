//! Time handling utilities for model runs and lead times.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One issuance of a forecast model, truncated to the hourly run cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRun {
    issuance: DateTime<Utc>,
}

impl ModelRun {
    /// Build a run from any timestamp; minutes and below are dropped.
    pub fn new(issuance: DateTime<Utc>) -> Self {
        Self {
            issuance: truncate_to_hour(issuance),
        }
    }

    pub fn issuance(&self) -> DateTime<Utc> {
        self.issuance
    }

    pub fn cycle_hour(&self) -> u32 {
        self.issuance.hour()
    }

    /// Run date as `YYYYMMDD`.
    pub fn date_label(&self) -> String {
        self.issuance.format("%Y%m%d").to_string()
    }

    /// Run date as `YYYY-MM-DD`.
    pub fn iso_date(&self) -> String {
        self.issuance.format("%Y-%m-%d").to_string()
    }

    /// Cycle as `HHz`.
    pub fn cycle_label(&self) -> String {
        format!("{:02}z", self.cycle_hour())
    }

    /// Valid time for a lead time within this run.
    pub fn valid_time(&self, lead: LeadTime) -> DateTime<Utc> {
        self.issuance + Duration::hours(lead.hours() as i64)
    }
}

impl fmt::Display for ModelRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.issuance.format("%Y-%m-%dT%H:00Z"))
    }
}

/// Non-negative hour offset from a run's issuance to a valid time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LeadTime(u32);

impl LeadTime {
    pub const fn new(hours: u32) -> Self {
        Self(hours)
    }

    pub const fn hours(&self) -> u32 {
        self.0
    }

    /// Zero-padded label, e.g. `f03`.
    pub fn label(&self) -> String {
        format!("f{:02}", self.0)
    }
}

impl fmt::Display for LeadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{:02}", self.0)
    }
}

/// Drop minutes, seconds, and sub-seconds.
pub fn truncate_to_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Interpret a zone-less timestamp as UTC.
pub fn assume_utc(ndt: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&ndt)
}

/// Parse a valid time from an ISO 8601 string.
///
/// Offsets are normalised to UTC; naive timestamps and bare dates are taken
/// to already be in UTC.
pub fn parse_valid_time(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Without timezone (assume UTC)
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(assume_utc(ndt));
        }
    }

    // Date only
    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S") {
        return Ok(assume_utc(ndt));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}
