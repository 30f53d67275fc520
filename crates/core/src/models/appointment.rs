use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{time_format, time_slot::Interval};
use crate::errors::{BookingError, BookingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    /// Only `scheduled` has outgoing edges; every other status is terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed
                    | AppointmentStatus::Cancelled
                    | AppointmentStatus::Rescheduled
            )
        )
    }

    pub fn is_terminal(self) -> bool {
        self != AppointmentStatus::Scheduled
    }

    /// Whether an appointment in this status holds its interval on the
    /// school's calendar.
    pub fn occupies_calendar(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Completed
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(BookingError::Validation(format!(
                "Unknown appointment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub end_time: NaiveTime,
    pub screening_type: String,
    pub expected_students: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    /// Opaque reference supplied by the identity provider.
    pub created_by: String,
    pub rescheduled_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    pub fn occupies_calendar(&self) -> bool {
        self.status.occupies_calendar()
    }

    /// Applies a status change if the state machine allows it.
    pub fn transition_to(&mut self, next: AppointmentStatus, at: DateTime<Utc>) -> BookingResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(BookingError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = at;
        Ok(())
    }
}

/// A fully validated booking ready to be committed by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub school_id: Uuid,
    pub date: NaiveDate,
    pub interval: Interval,
    /// Grid slot starts covered by `interval`; one occupancy key each.
    pub slot_starts: Vec<NaiveTime>,
    pub screening_type: String,
    pub expected_students: i32,
    pub notes: Option<String>,
    pub created_by: String,
    pub rescheduled_from: Option<Uuid>,
}

impl NewAppointment {
    pub fn into_appointment(self, id: Uuid, at: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            school_id: self.school_id,
            date: self.date,
            start_time: self.interval.start_time,
            end_time: self.interval.end_time,
            screening_type: self.screening_type,
            expected_students: self.expected_students,
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            created_by: self.created_by,
            rescheduled_from: self.rescheduled_from,
            created_at: at,
            updated_at: at,
        }
    }

    /// First occupying appointment whose interval overlaps this booking.
    pub fn find_conflict<'a, I>(&self, existing: I) -> Option<&'a Appointment>
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        existing.into_iter().find(|appointment| {
            appointment.occupies_calendar()
                && appointment.school_id == self.school_id
                && appointment.date == self.date
                && appointment.interval().overlaps(&self.interval)
        })
    }

    pub fn conflict_with(&self, existing: &Appointment) -> BookingError {
        BookingError::Conflict {
            school_id: self.school_id,
            date: self.date,
            requested: self.interval,
            conflicting: existing.interval(),
        }
    }
}

/// Outcome of a reschedule: the retired appointment and its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rescheduled {
    pub previous: Appointment,
    pub appointment: Appointment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub school_id: Uuid,
    pub date: NaiveDate,
    #[serde(with = "time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub end_time: NaiveTime,
    pub screening_type: String,
    pub expected_students: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    /// Defaults to the current appointment's date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(with = "time_format")]
    pub start_time: NaiveTime,
    #[serde(with = "time_format")]
    pub end_time: NaiveTime,
}
