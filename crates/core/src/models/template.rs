use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time_format;
use crate::errors::{BookingError, BookingResult};

/// What to do with the tail of the operating window when the slot duration
/// does not divide it evenly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// The trailing partial interval is not offered.
    #[default]
    Discard,
    /// The trailing partial interval becomes a final, shorter slot.
    PartialSlot,
    /// The template is invalid unless the window divides evenly.
    Reject,
}

impl RemainderPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemainderPolicy::Discard => "discard",
            RemainderPolicy::PartialSlot => "partial_slot",
            RemainderPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RemainderPolicy {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discard" => Ok(RemainderPolicy::Discard),
            "partial_slot" => Ok(RemainderPolicy::PartialSlot),
            "reject" => Ok(RemainderPolicy::Reject),
            other => Err(BookingError::Validation(format!(
                "Unknown remainder policy: {other}"
            ))),
        }
    }
}

/// Daily operating window and slot granularity for one school, or the
/// service-wide default when `school_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursTemplate {
    #[serde(default)]
    pub school_id: Option<Uuid>,
    #[serde(with = "time_format")]
    pub day_start: NaiveTime,
    #[serde(with = "time_format")]
    pub day_end: NaiveTime,
    pub slot_minutes: u32,
    #[serde(default)]
    pub blackout_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub remainder: RemainderPolicy,
}

impl WorkingHoursTemplate {
    pub fn new(day_start: NaiveTime, day_end: NaiveTime, slot_minutes: u32) -> Self {
        Self {
            school_id: None,
            day_start,
            day_end,
            slot_minutes,
            blackout_dates: Vec::new(),
            remainder: RemainderPolicy::default(),
        }
    }

    pub fn for_school(mut self, school_id: Uuid) -> Self {
        self.school_id = Some(school_id);
        self
    }

    pub fn with_blackout_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.blackout_dates.extend(dates);
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn is_blackout(&self, date: NaiveDate) -> bool {
        self.blackout_dates.contains(&date)
    }

    pub(crate) fn window_seconds(&self) -> i64 {
        i64::from(self.day_end.num_seconds_from_midnight())
            - i64::from(self.day_start.num_seconds_from_midnight())
    }

    pub(crate) fn slot_seconds(&self) -> i64 {
        i64::from(self.slot_minutes) * 60
    }

    /// Checks the template invariants before the template is used for
    /// slot generation or alignment.
    pub fn validate(&self) -> BookingResult<()> {
        if self.day_start >= self.day_end {
            return Err(BookingError::Validation(format!(
                "Working hours must start before they end ({} >= {})",
                time_format::format(&self.day_start),
                time_format::format(&self.day_end)
            )));
        }

        if self.slot_minutes == 0 {
            return Err(BookingError::Validation(
                "Slot duration must be at least one minute".to_string(),
            ));
        }

        if self.slot_seconds() > self.window_seconds() {
            return Err(BookingError::Validation(format!(
                "Slot duration of {} minutes exceeds the operating window",
                self.slot_minutes
            )));
        }

        if self.remainder == RemainderPolicy::Reject
            && self.window_seconds() % self.slot_seconds() != 0
        {
            return Err(BookingError::Validation(format!(
                "Slot duration of {} minutes does not evenly divide {}-{}",
                self.slot_minutes,
                time_format::format(&self.day_start),
                time_format::format(&self.day_end)
            )));
        }

        Ok(())
    }
}
