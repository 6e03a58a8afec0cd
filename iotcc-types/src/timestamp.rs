//! Wall-clock helpers.
//!
//! Outbound messages carry UTC milliseconds; durable records carry a
//! second-resolution UTC timestamp that is compared against boot time to
//! decide whether a cached record predates the current process.

use crate::Error;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Format used for `Entity_Timestamp` and `LastSeenTimestamp`.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Milliseconds since the Unix epoch, UTC.
#[must_use]
pub fn utc_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Second-resolution timestamp stored in local records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordTimestamp(NaiveDateTime);

impl RecordTimestamp {
    /// The current time, truncated to whole seconds.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts a UTC datetime, truncating sub-second precision.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let naive = dt.naive_utc();
        Self(naive.with_nanosecond(0).unwrap_or(naive))
    }

    /// Parses the record format (`%Y-%m-%dT%H:%M:%S`).
    pub fn parse(s: &str) -> Result<Self, Error> {
        NaiveDateTime::parse_from_str(s, RECORD_TIME_FORMAT)
            .map(Self)
            .map_err(|e| Error::InvalidTimestamp(format!("{s}: {e}")))
    }

    /// Returns true if this timestamp is at or before the given instant.
    #[must_use]
    pub fn is_at_or_before(&self, instant: &DateTime<Utc>) -> bool {
        self.0 <= instant.naive_utc()
    }
}

impl fmt::Display for RecordTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RECORD_TIME_FORMAT))
    }
}

impl Serialize for RecordTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
