//! # Storage Traits
//!
//! The booking core talks to persistence only through these traits. The
//! PostgreSQL and in-memory implementations live in `slotbook-db`.
//!
//! Implementations of [`BookingStore`] own the serialization point for a
//! (school, date) pair: `insert_if_free` and `reschedule` must re-read the
//! occupying appointments and re-check overlap inside the same transaction or
//! lock that performs the write. Races they cannot settle deterministically
//! are reported as [`BookingError::Transient`](crate::errors::BookingError)
//! so the allocator can retry them.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    errors::BookingResult,
    models::{
        appointment::{Appointment, AppointmentStatus, NewAppointment, Rescheduled},
        school::School,
        template::WorkingHoursTemplate,
    },
};

/// Read-only view of the external school directory and its templates.
#[async_trait]
pub trait SchoolDirectory: Send + Sync {
    async fn find_school(&self, school_id: Uuid) -> BookingResult<Option<School>>;

    async fn find_template(&self, school_id: Uuid) -> BookingResult<Option<WorkingHoursTemplate>>;
}

/// The authoritative set of appointments.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>>;

    /// Every appointment for the school and date regardless of status,
    /// ordered by start time.
    async fn list_appointments(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>>;

    /// Appointments that currently hold their interval on the calendar.
    async fn list_occupying(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>>;

    /// Commits `booking` as a scheduled appointment unless it overlaps an
    /// occupying appointment, in which case a conflict is returned.
    async fn insert_if_free(&self, booking: NewAppointment) -> BookingResult<Appointment>;

    /// Applies a single state-machine transition.
    async fn transition(&self, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment>;

    /// Marks `id` as rescheduled, releases its interval and commits
    /// `replacement`, all or nothing.
    async fn reschedule(&self, id: Uuid, replacement: NewAppointment) -> BookingResult<Rescheduled>;
}
