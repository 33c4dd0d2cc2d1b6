//! Wire-exact timestamp and duration values
//!
//! Both are `seconds + nanos` pairs, matching the well-known protobuf
//! `Timestamp` and `Duration` messages so peers agree bit for bit.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// An absolute instant relative to the Unix epoch
///
/// `nanos` is always in `0..1_000_000_000`, also for instants before the epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    /// Create a timestamp, returning `None` if `nanos` is out of range
    pub fn new(seconds: i64, nanos: i32) -> Option<Self> {
        let ts = Self { seconds, nanos };
        ts.is_valid().then_some(ts)
    }

    /// Whether `nanos` lies in `0..1_000_000_000`
    pub fn is_valid(&self) -> bool {
        (0..NANOS_PER_SECOND).contains(&self.nanos)
    }

    pub fn now() -> Self {
        SystemTime::now().into()
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Self {
                seconds: since.as_secs() as i64,
                nanos: since.subsec_nanos() as i32,
            },
            Err(err) => {
                let before = err.duration();
                let mut seconds = -(before.as_secs() as i64);
                let mut nanos = -(before.subsec_nanos() as i32);
                if nanos < 0 {
                    seconds -= 1;
                    nanos += NANOS_PER_SECOND;
                }
                Self { seconds, nanos }
            }
        }
    }
}

impl TryFrom<Timestamp> for SystemTime {
    type Error = Timestamp;

    fn try_from(ts: Timestamp) -> Result<Self, Self::Error> {
        if !ts.is_valid() {
            return Err(ts);
        }
        let nanos = std::time::Duration::from_nanos(ts.nanos as u64);
        let result = if ts.seconds >= 0 {
            UNIX_EPOCH
                .checked_add(std::time::Duration::from_secs(ts.seconds as u64))
                .and_then(|t| t.checked_add(nanos))
        } else {
            UNIX_EPOCH
                .checked_sub(std::time::Duration::from_secs(ts.seconds.unsigned_abs()))
                .and_then(|t| t.checked_add(nanos))
        };
        result.ok_or(ts)
    }
}

/// A signed span of time
///
/// `seconds` and `nanos` never have opposite signs and `|nanos| < 1e9`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration {
    pub seconds: i64,
    pub nanos: i32,
}

impl Duration {
    /// Create a duration, returning `None` if the parts are inconsistent
    pub fn new(seconds: i64, nanos: i32) -> Option<Self> {
        let d = Self { seconds, nanos };
        d.is_valid().then_some(d)
    }

    pub fn is_valid(&self) -> bool {
        let in_range = self.nanos > -NANOS_PER_SECOND && self.nanos < NANOS_PER_SECOND;
        let same_sign = !(self.seconds > 0 && self.nanos < 0 || self.seconds < 0 && self.nanos > 0);
        in_range && same_sign
    }

    pub fn is_negative(&self) -> bool {
        self.seconds < 0 || self.nanos < 0
    }

    /// The same span pointing the other way
    pub fn negated(self) -> Self {
        Self {
            seconds: -self.seconds,
            nanos: -self.nanos,
        }
    }

    pub fn from_millis(millis: i64) -> Self {
        Self {
            seconds: millis / 1000,
            nanos: ((millis % 1000) * 1_000_000) as i32,
        }
    }
}

impl TryFrom<std::time::Duration> for Duration {
    type Error = std::time::Duration;

    fn try_from(d: std::time::Duration) -> Result<Self, Self::Error> {
        let seconds = i64::try_from(d.as_secs()).map_err(|_| d)?;
        Ok(Self {
            seconds,
            nanos: d.subsec_nanos() as i32,
        })
    }
}

impl TryFrom<Duration> for std::time::Duration {
    type Error = Duration;

    /// Fails for negative or malformed spans
    fn try_from(d: Duration) -> Result<Self, Self::Error> {
        if !d.is_valid() || d.is_negative() {
            return Err(d);
        }
        Ok(std::time::Duration::new(d.seconds as u64, d.nanos as u32))
    }
}
