use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

// builtin_interfaces/Time like struct
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Encode, Decode,
)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Builds a stamp from nanoseconds since the epoch, saturating at the i32 second range.
    pub fn from_nanos(nanos: u64) -> Self {
        let sec = (nanos / NANOS_PER_SEC).min(i32::MAX as u64) as i32;
        let nanosec = (nanos % NANOS_PER_SEC) as u32;
        Self { sec, nanosec }
    }

    /// Negative or non-finite inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::default();
        }
        Self::from_nanos((secs * NANOS_PER_SEC as f64).round() as u64)
    }

    pub fn as_nanos(&self) -> u64 {
        self.sec.max(0) as u64 * NANOS_PER_SEC + self.nanosec as u64
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 / NANOS_PER_SEC as f64
    }
}

impl From<Duration> for Time {
    fn from(duration: Duration) -> Self {
        Self::from_nanos(duration.as_nanos().min(u64::MAX as u128) as u64)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nanosec)
    }
}

// std_msgs/Header like struct
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: Time, frame_id: impl Into<String>) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}
