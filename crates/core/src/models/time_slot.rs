use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time_format;

/// Half-open wall-clock interval `[start_time, end_time)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    #[serde(with = "time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub end_time: NaiveTime,
}

impl Interval {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Two half-open intervals overlap iff each starts before the other ends.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }

    pub fn is_empty(&self) -> bool {
        self.start_time >= self.end_time
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            time_format::format(&self.start_time),
            time_format::format(&self.end_time)
        )
    }
}

/// One cell of a day's slot lattice. Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    #[serde(with = "time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub end_time: NaiveTime,
    pub available: bool,
}

impl TimeSlot {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub school_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}
