//! `Duration` and `Timestamp` values: signed/instant nanosecond-precision
//! quantities per §3.1. Arithmetic is checked uniformly with `Int`
//! (SPEC_FULL §4 resolves the open question about overflow policy).
use std::fmt;

use super::error::ValueError;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Duration {
    pub nanos: i64,
}

impl Duration {
    pub fn from_nanos(nanos: i64) -> Duration {
        Duration { nanos }
    }

    pub fn checked_add(&self, other: &Duration) -> Result<Duration, ValueError> {
        self.nanos
            .checked_add(other.nanos)
            .map(Duration::from_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }

    pub fn checked_sub(&self, other: &Duration) -> Result<Duration, ValueError> {
        self.nanos
            .checked_sub(other.nanos)
            .map(Duration::from_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }

    pub fn checked_neg(&self) -> Result<Duration, ValueError> {
        self.nanos
            .checked_neg()
            .map(Duration::from_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.nanos / NANOS_PER_SECOND;
        let rem = (self.nanos % NANOS_PER_SECOND).abs();
        if rem == 0 {
            write!(f, "{secs}s")
        } else {
            write!(f, "{secs}.{rem:09}s")
        }
    }
}

/// An instant with nanosecond precision, represented as nanoseconds since
/// the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Timestamp {
    pub unix_nanos: i64,
}

impl Timestamp {
    pub fn from_unix_nanos(unix_nanos: i64) -> Timestamp {
        Timestamp { unix_nanos }
    }

    pub fn checked_add(&self, d: &Duration) -> Result<Timestamp, ValueError> {
        self.unix_nanos
            .checked_add(d.nanos)
            .map(Timestamp::from_unix_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }

    pub fn checked_sub_duration(&self, d: &Duration) -> Result<Timestamp, ValueError> {
        self.unix_nanos
            .checked_sub(d.nanos)
            .map(Timestamp::from_unix_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }

    pub fn checked_sub_timestamp(&self, other: &Timestamp) -> Result<Duration, ValueError> {
        self.unix_nanos
            .checked_sub(other.unix_nanos)
            .map(Duration::from_nanos)
            .ok_or_else(ValueError::integer_overflow)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.unix_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_add_overflow_errors() {
        let a = Duration::from_nanos(i64::MAX);
        let b = Duration::from_nanos(1);
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn timestamp_minus_timestamp_is_duration() {
        let a = Timestamp::from_unix_nanos(10);
        let b = Timestamp::from_unix_nanos(3);
        assert_eq!(a.checked_sub_timestamp(&b).unwrap(), Duration::from_nanos(7));
    }
}
