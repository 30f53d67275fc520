//! # Booking Allocator
//!
//! The allocator is the only write path for appointments. It validates a
//! request against the school's slot grid, then hands the commit to the
//! [`BookingStore`], which re-checks overlap under its per-(school, date)
//! serialization point.
//!
//! ## Retries
//!
//! Two kinds of failure are kept strictly apart:
//!
//! - **Conflicts** are deterministic. Retrying would hit the same booking
//!   again, so they are returned immediately and the caller is expected to
//!   re-query availability.
//! - **Transient** failures (constraint races, serialization failures,
//!   timeouts, dropped connections) are retried with exponential backoff
//!   until the [`RetryPolicy`] budget runs out, at which point the caller
//!   receives [`BookingError::ServiceUnavailable`].
//!
//! Every attempt runs under `attempt_timeout`; a timed-out attempt counts as
//! a transient failure.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{NaiveDate, NaiveTime, Utc};
use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::{
            Appointment, AppointmentStatus, CreateAppointmentRequest, NewAppointment,
            RescheduleAppointmentRequest, Rescheduled,
        },
        time_slot::Interval,
    },
    slots,
    store::{BookingStore, SchoolDirectory},
    templates::TemplateResolver,
};

pub const MAX_SCREENING_TYPE_LEN: usize = 64;
pub const MAX_NOTES_LEN: usize = 2000;

/// Bounded retry budget for transient storage failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`,
    /// capped at `max_backoff`, then reduced by up to half at random so
    /// that colliding writers spread out.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let ceiling = self
            .base_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);

        let jitter_ms = u64::try_from(ceiling.as_millis() / 2).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return ceiling;
        }
        ceiling.saturating_sub(Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorPolicy {
    pub retry: RetryPolicy,
    /// Reject bookings for dates before today (UTC).
    pub reject_past_dates: bool,
}

impl Default for AllocatorPolicy {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            reject_past_dates: true,
        }
    }
}

#[derive(Clone)]
pub struct BookingAllocator {
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn SchoolDirectory>,
    templates: TemplateResolver,
    policy: AllocatorPolicy,
}

impl BookingAllocator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn SchoolDirectory>,
        templates: TemplateResolver,
        policy: AllocatorPolicy,
    ) -> Self {
        Self {
            store,
            directory,
            templates,
            policy,
        }
    }

    pub fn policy(&self) -> &AllocatorPolicy {
        &self.policy
    }

    /// Books a new scheduled appointment.
    ///
    /// # Errors
    ///
    /// * `BookingError::Validation` - bad details, past or blackout date, interval off the grid
    /// * `BookingError::NotFound` - unknown school
    /// * `BookingError::Conflict` - the interval overlaps an existing booking
    /// * `BookingError::ServiceUnavailable` - transient retry budget exhausted
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        created_by: &str,
    ) -> BookingResult<Appointment> {
        validate_details(&request.screening_type, request.expected_students, request.notes.as_deref())?;

        let interval = Interval::new(request.start_time, request.end_time);
        let slot_starts = self
            .prepare_interval(request.school_id, request.date, interval)
            .await?;

        let booking = NewAppointment {
            school_id: request.school_id,
            date: request.date,
            interval,
            slot_starts,
            screening_type: request.screening_type.trim().to_string(),
            expected_students: request.expected_students,
            notes: normalize_notes(request.notes),
            created_by: created_by.to_string(),
            rescheduled_from: None,
        };

        let appointment = self
            .with_retries(request.school_id, request.date, interval, || {
                self.store.insert_if_free(booking.clone())
            })
            .await?;

        info!(
            "Booked appointment {} for school {} on {} at {}",
            appointment.id,
            appointment.school_id,
            appointment.date,
            appointment.interval()
        );
        Ok(appointment)
    }

    /// Cancels a scheduled appointment. Status-only; the row is kept.
    pub async fn cancel_appointment(&self, id: Uuid) -> BookingResult<Appointment> {
        let appointment = self.transition(id, AppointmentStatus::Cancelled).await?;
        info!(
            "Cancelled appointment {}, freeing {} on {}",
            id,
            appointment.interval(),
            appointment.date
        );
        Ok(appointment)
    }

    /// Marks a scheduled appointment as completed. The interval stays taken.
    pub async fn complete_appointment(&self, id: Uuid) -> BookingResult<Appointment> {
        let appointment = self.transition(id, AppointmentStatus::Completed).await?;
        info!("Completed appointment {}", id);
        Ok(appointment)
    }

    /// Moves a scheduled appointment to a new interval (and optionally a new
    /// date). The old appointment becomes `rescheduled` and a new one is
    /// created in the same store transaction; on any failure the original is
    /// left untouched.
    pub async fn reschedule_appointment(
        &self,
        id: Uuid,
        request: RescheduleAppointmentRequest,
        created_by: &str,
    ) -> BookingResult<Rescheduled> {
        let current = self
            .store
            .get_appointment(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

        if !current.status.can_transition_to(AppointmentStatus::Rescheduled) {
            return Err(BookingError::InvalidTransition {
                id,
                from: current.status,
                to: AppointmentStatus::Rescheduled,
            });
        }

        let date = request.date.unwrap_or(current.date);
        let interval = Interval::new(request.start_time, request.end_time);
        let slot_starts = self.prepare_interval(current.school_id, date, interval).await?;

        let replacement = NewAppointment {
            school_id: current.school_id,
            date,
            interval,
            slot_starts,
            screening_type: current.screening_type.clone(),
            expected_students: current.expected_students,
            notes: current.notes.clone(),
            created_by: created_by.to_string(),
            rescheduled_from: Some(current.id),
        };

        let moved = self
            .with_retries(current.school_id, date, interval, || {
                self.store.reschedule(id, replacement.clone())
            })
            .await?;

        info!(
            "Rescheduled appointment {} ({} {}) to {} ({} {})",
            moved.previous.id,
            moved.previous.date,
            moved.previous.interval(),
            moved.appointment.id,
            moved.appointment.date,
            moved.appointment.interval()
        );
        Ok(moved)
    }

    async fn transition(&self, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment> {
        let attempt_timeout = self.policy.retry.attempt_timeout;
        match timeout(attempt_timeout, self.store.transition(id, to)).await {
            Ok(result) => result,
            Err(_) => Err(BookingError::Transient(format!(
                "status change of appointment {} timed out after {} ms",
                id,
                attempt_timeout.as_millis()
            ))),
        }
    }

    /// Validates the interval against the school's calendar and returns the
    /// slot starts it covers.
    async fn prepare_interval(
        &self,
        school_id: Uuid,
        date: NaiveDate,
        interval: Interval,
    ) -> BookingResult<Vec<NaiveTime>> {
        if interval.is_empty() {
            return Err(BookingError::Validation(format!(
                "start_time must be before end_time (got {})",
                interval
            )));
        }

        if self.policy.reject_past_dates && date < Utc::now().date_naive() {
            return Err(BookingError::Validation(format!(
                "Cannot book {} for school {}: date is in the past",
                date, school_id
            )));
        }

        self.directory
            .find_school(school_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("School with ID {} not found", school_id)))?;

        let template = self.templates.get_template(school_id).await?;

        if template.is_blackout(date) {
            return Err(BookingError::Validation(format!(
                "School {} does not accept bookings on {}",
                school_id, date
            )));
        }

        if !slots::is_aligned(interval.start_time, interval.end_time, &template) {
            return Err(BookingError::Validation(format!(
                "Interval {} on {} does not align with the {}-minute slot grid of school {}",
                interval, date, template.slot_minutes, school_id
            )));
        }

        Ok(slots::covered_slot_starts(&template, &interval))
    }

    async fn with_retries<T, F, Fut>(
        &self,
        school_id: Uuid,
        date: NaiveDate,
        requested: Interval,
        mut attempt_fn: F,
    ) -> BookingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = BookingResult<T>>,
    {
        let retry = self.policy.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match timeout(retry.attempt_timeout, attempt_fn()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(BookingError::Transient(format!(
                    "attempt timed out after {} ms",
                    retry.attempt_timeout.as_millis()
                ))),
            };

            match outcome {
                Err(err) if err.is_transient() => {
                    if attempt >= retry.max_attempts() {
                        error!(
                            "Giving up on school {} {} {} after {} attempts: {}",
                            school_id, date, requested, attempt, err
                        );
                        return Err(BookingError::ServiceUnavailable {
                            school_id,
                            date,
                            requested,
                            attempts: attempt,
                        });
                    }

                    let delay = retry.backoff(attempt);
                    warn!(
                        "Transient failure booking school {} {} {} (attempt {}/{}), retrying in {:?}: {}",
                        school_id,
                        date,
                        requested,
                        attempt,
                        retry.max_attempts(),
                        delay,
                        err
                    );
                    sleep(delay).await;
                }
                Err(err @ BookingError::Conflict { .. }) => {
                    warn!("{}", err);
                    return Err(err);
                }
                other => return other,
            }
        }
    }
}

fn validate_details(screening_type: &str, expected_students: i32, notes: Option<&str>) -> BookingResult<()> {
    let screening_type = screening_type.trim();
    if screening_type.is_empty() {
        return Err(BookingError::Validation("screening_type is required".to_string()));
    }
    if screening_type.chars().count() > MAX_SCREENING_TYPE_LEN {
        return Err(BookingError::Validation(format!(
            "screening_type must be at most {} characters",
            MAX_SCREENING_TYPE_LEN
        )));
    }
    if expected_students <= 0 {
        return Err(BookingError::Validation(format!(
            "expected_students must be greater than zero (got {})",
            expected_students
        )));
    }
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(BookingError::Validation(format!(
            "notes must be at most {} characters",
            MAX_NOTES_LEN
        )));
    }
    Ok(())
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}
