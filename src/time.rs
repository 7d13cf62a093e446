//! Apple-epoch timestamp normalization (§4.A).

use chrono::{DateTime, Local, TimeZone, Utc};
use derive_deref::Deref;

/// Local-zone, timezone-aware instant. Newtype over `chrono`'s `DateTime<Local>`,
/// matching the teacher's `Deref`-newtype convention for domain primitives.
#[derive(Deref, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Local>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Local::now())
    }

    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Builds a local-zone timestamp from a plain Unix-epoch second count
    /// (e.g. from an RFC 5322 `Date` header), as opposed to the Apple-epoch
    /// path in [`apple_ts_to_local`].
    pub fn from_unix_seconds(unix_seconds: i64) -> Self {
        let utc = Utc.timestamp_opt(unix_seconds, 0).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
        Timestamp(utc.with_timezone(&Local))
    }
}

const APPLE_EPOCH_UNIX_SECONDS: i64 = 978_307_200; // 2001-01-01T00:00:00Z

/// Converts an Apple-epoch integer of unknown unit (seconds, microseconds or
/// nanoseconds since 2001-01-01 UTC) to a local-zone timestamp. `None` is
/// treated as zero, matching `unified/normalize/time.py`'s lenient handling
/// (the stricter `imessage_exporter` variant raises instead; this crate
/// follows the "unified" system's behavior per SPEC_FULL.md).
pub fn apple_ts_to_local(raw: Option<i64>) -> Timestamp {
    let raw = raw.unwrap_or(0);
    let seconds_since_apple_epoch = if raw != 0 && raw % 1_000_000_000 == 0 {
        raw / 1_000_000_000
    } else if raw != 0 && raw % 1_000_000 == 0 {
        raw / 1_000_000
    } else {
        raw
    };
    let unix_seconds = APPLE_EPOCH_UNIX_SECONDS + seconds_since_apple_epoch;
    let utc = Utc.timestamp_opt(unix_seconds, 0).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    Timestamp(utc.with_timezone(&Local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apple_epoch_units_agree() {
        // A non-multiple-of-1000 base so the µs/ns forms don't collide under
        // the divisibility-based unit detection (mirrors `test_time.py`).
        let seconds = 600i64;
        let micros = seconds * 1_000_000;
        let nanos = seconds * 1_000_000_000;
        let a = apple_ts_to_local(Some(seconds));
        let b = apple_ts_to_local(Some(micros));
        let c = apple_ts_to_local(Some(nanos));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn none_is_zero() {
        let from_none = apple_ts_to_local(None);
        let from_zero = apple_ts_to_local(Some(0));
        assert_eq!(from_none, from_zero);
    }
}
