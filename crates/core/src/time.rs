//! Timestamps
//!
//! [`Timestamp`] is wire-compatible with `google.protobuf.Timestamp`: signed
//! seconds since the Unix epoch plus a non-negative nanosecond offset. The
//! derived ordering compares seconds first, then nanos, which is the
//! chronological order for normalized values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// A point in time with nanosecond resolution
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Message, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    #[prost(int64, tag = "1")]
    #[serde(default)]
    pub seconds: i64,
    /// Nanoseconds within the second, in `[0, 1e9)`
    #[prost(int32, tag = "2")]
    #[serde(default)]
    pub nanos: i32,
}

impl Timestamp {
    /// Earliest representable timestamp (0001-01-01T00:00:00Z)
    pub const MIN: Timestamp = Timestamp {
        seconds: -62_135_596_800,
        nanos: 0,
    };

    /// Latest representable timestamp (9999-12-31T23:59:59Z)
    pub const MAX: Timestamp = Timestamp {
        seconds: 253_402_300_799,
        nanos: 0,
    };

    /// Create a timestamp, normalizing `nanos` into `[0, 1e9)`
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let total = i64::from(nanos);
        let seconds = seconds + total.div_euclid(NANOS_PER_SECOND);
        let nanos = total.rem_euclid(NANOS_PER_SECOND) as i32;
        Timestamp { seconds, nanos }
    }

    /// Create a timestamp from whole seconds
    pub fn from_secs(seconds: i64) -> Self {
        Timestamp { seconds, nanos: 0 }
    }

    /// Create a timestamp from fractional seconds
    pub fn from_secs_f64(secs: f64) -> Self {
        let seconds = secs.floor();
        let nanos = ((secs - seconds) * 1e9).round() as i32;
        Timestamp::new(seconds as i64, nanos)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        Timestamp::new(now.timestamp(), now.timestamp_subsec_nanos() as i32)
    }

    /// Nanoseconds since the Unix epoch
    pub fn as_nanos(&self) -> i128 {
        i128::from(self.seconds) * i128::from(NANOS_PER_SECOND) + i128::from(self.nanos)
    }

    /// Absolute distance between two timestamps
    pub fn abs_diff(&self, other: &Timestamp) -> Duration {
        let nanos = (self.as_nanos() - other.as_nanos()).unsigned_abs();
        let secs = (nanos / NANOS_PER_SECOND as u128) as u64;
        let sub = (nanos % NANOS_PER_SECOND as u128) as u32;
        Duration::new(secs, sub)
    }

    /// RFC 3339 rendering, when the value is within chrono's range
    pub fn to_rfc3339(&self) -> Option<String> {
        chrono::DateTime::from_timestamp(self.seconds, self.nanos as u32).map(|dt| dt.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

impl From<std::time::SystemTime> for Timestamp {
    fn from(t: std::time::SystemTime) -> Self {
        match t.duration_since(std::time::UNIX_EPOCH) {
            Ok(d) => Timestamp::new(d.as_secs() as i64, d.subsec_nanos() as i32),
            Err(e) => {
                let d = e.duration();
                Timestamp::new(-(d.as_secs() as i64), -(d.subsec_nanos() as i32))
            }
        }
    }
}
