//! Time-axis conversions.
//!
//! Time coordinates are stored as offsets from an origin, described by a
//! units attribute such as `hours since 2020-01-01 00:00:00`. Instants are
//! exchanged with callers in a single canonical format.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::error::{NcGridError, Result};

/// Canonical textual form of an instant, e.g. `2020-01-01T00:00:00.000Z`
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const ORIGIN_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Unit of a time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Seconds,
            "min" | "mins" | "minute" | "minutes" => TimeUnit::Minutes,
            "d" | "day" | "days" => TimeUnit::Days,
            _ => TimeUnit::Hours,
        }
    }

    fn per_hour(self) -> f64 {
        match self {
            TimeUnit::Seconds => 3600.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 1.0,
            TimeUnit::Days => 1.0 / 24.0,
        }
    }
}

/// A parsed `<unit> since <origin>` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub origin: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a units attribute. An origin that cannot be read falls back to
    /// the Unix epoch.
    pub fn parse(units: &str) -> Self {
        let unit = units
            .split_whitespace()
            .next()
            .map(TimeUnit::parse)
            .unwrap_or(TimeUnit::Hours);

        let origin_text = units
            .to_ascii_lowercase()
            .split_once("since")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| units.to_string());

        let origin = parse_origin(&origin_text).unwrap_or_else(|| {
            warn!(units = units, "Unreadable time origin, using the epoch");
            epoch()
        });

        Self { unit, origin }
    }

    /// Axis value for `instant`: whole hours since the origin, in axis units.
    pub fn offset_of(&self, instant: &DateTime<Utc>) -> f64 {
        let hours = (*instant - self.origin).num_hours();
        hours as f64 * self.unit.per_hour()
    }

    /// Instant for an axis value, rounded to the whole hour.
    pub fn instant_at(&self, value: f64) -> DateTime<Utc> {
        let hours = (value / self.unit.per_hour()).round() as i64;
        self.origin + chrono::Duration::hours(hours)
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::from(std::time::UNIX_EPOCH)
}

/// Read an origin timestamp. Letters (`T`, `Z`, `UTC`) are treated as
/// separators; a trailing zone offset is ignored.
pub fn parse_origin(text: &str) -> Option<DateTime<Utc>> {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphabetic() { ' ' } else { c })
        .collect();
    let tokens: Vec<&str> = cleaned.split_whitespace().take(2).collect();
    let candidate = tokens.join(" ");

    for format in ORIGIN_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&candidate, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    tokens
        .first()
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Reference time stored in a time-origin attribute; absent when unreadable.
pub fn parse_time_origin(text: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_origin(text);
    if parsed.is_none() {
        warn!(value = text, "Unreadable time origin attribute");
    }
    parsed
}

/// Format an instant in the canonical form.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

/// Parse a caller-supplied instant (RFC 3339 or any accepted origin form).
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text.trim()) {
        return Ok(parsed.with_timezone(&Utc));
    }
    parse_origin(text).ok_or_else(|| NcGridError::InvalidParameter {
        param: "time".to_string(),
        message: format!("Cannot parse '{}' as a timestamp", text),
    })
}
