//! Reference-time candidates and resolved recording start times.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A GPS reference sentence parsed into its useful fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCandidate {
    /// UTC time of day from the GPS fix
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// UTC calendar date from the GPS fix
    pub month: u8,
    pub day: u8,
    /// Device clock (coarse seconds) when the sentence was captured
    pub device_seconds: u32,
}

impl ReferenceCandidate {
    /// GPS time of day in seconds since UTC midnight.
    pub fn time_of_day_secs(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

/// Wall-clock moment the device clock read zero, in local civil time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedStartTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub month: u8,
    pub day: u8,
}

impl ResolvedStartTime {
    /// Time-of-day part as a chrono value.
    pub fn time_of_day(&self) -> Option<chrono::NaiveTime> {
        chrono::NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }
}

impl fmt::Display for ResolvedStartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_of_day() {
            Some(time) => write!(f, "{}", time.format("%H:%M:%S"))?,
            None => write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?,
        }
        write!(f, " {:02}/{:02}", self.month, self.day)
    }
}

/// A resolved start time together with how many reference sentences implied it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedStartTime {
    pub start: ResolvedStartTime,
    pub count: usize,
}

impl fmt::Display for RankedStartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.start, self.count)
    }
}
