//! Event ordering keys
//!
//! Events are opaque JSON objects; the log only interprets two fields:
//! `sim_time` (simulated-timeline instant, primary sort key) and `timestamp`
//! (wall-clock capture instant, tie-break key). Everything else is payload
//! passed through unchanged.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{ChronicleError, Result};

/// The pair of ordering instants carried by every event
///
/// Ordering is lexicographic: `sim_time` first, then `timestamp`. Events that
/// compare equal keep their encounter order under a stable sort, which is
/// what makes replay deterministic when several agents act in the same
/// simulated instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// Simulated-timeline instant (primary sort key)
    pub sim_time: DateTime<Utc>,

    /// Wall-clock capture instant (tie-break key)
    pub timestamp: DateTime<Utc>,
}

impl EventKey {
    /// Extract the ordering key from a parsed event object
    ///
    /// Fails with a decode error if either field is missing, not a string,
    /// or not a parseable timestamp.
    pub fn from_value(event: &Value) -> Result<Self> {
        Ok(Self {
            sim_time: required_timestamp(event, "sim_time")?,
            timestamp: required_timestamp(event, "timestamp")?,
        })
    }
}

/// Read a required timestamp-string field from an event object
fn required_timestamp(event: &Value, field: &str) -> Result<DateTime<Utc>> {
    let raw = event
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ChronicleError::Decode(format!("event missing timestamp field '{}'", field))
        })?;

    parse_timestamp(raw).ok_or_else(|| {
        ChronicleError::Decode(format!(
            "event field '{}' is not a parseable timestamp: {:?}",
            field, raw
        ))
    })
}

/// Parse a timestamp string as produced by event producers
///
/// Accepts RFC 3339 (with offset or `Z`) and naive ISO-8601 date-times;
/// naive values are interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}
