//! # PostgreSQL Booking Store
//!
//! Writes follow the optimistic strategy:
//!
//! 1. open a transaction,
//! 2. re-read the occupying appointments for the (school, date) and reject
//!    overlaps as conflicts,
//! 3. insert the appointment plus one `appointment_slots` row per covered
//!    grid slot.
//!
//! Two writers racing past step 2 collide on the `appointment_slots` primary
//! key in step 3. The loser's unique violation is classified as transient, so
//! the allocator retries it and the retry's re-check reports the conflict.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::{Appointment, AppointmentStatus, NewAppointment, Rescheduled},
        school::School,
        template::WorkingHoursTemplate,
    },
    store::{BookingStore, SchoolDirectory},
};
use sqlx::PgConnection;
use tracing::debug;
use uuid::Uuid;

use crate::{
    DbPool, classify,
    models::DbAppointment,
    repositories::{appointment, school, template},
};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn into_appointments(rows: Vec<DbAppointment>) -> BookingResult<Vec<Appointment>> {
    rows.into_iter().map(Appointment::try_from).collect()
}

/// Re-checks overlap and commits `booking` on an open transaction.
async fn insert_checked(conn: &mut PgConnection, booking: &NewAppointment) -> BookingResult<Appointment> {
    let occupying = appointment::list_occupying(&mut *conn, booking.school_id, booking.date)
        .await
        .map_err(classify)
        .and_then(into_appointments)?;

    if let Some(existing) = booking.find_conflict(&occupying) {
        return Err(booking.conflict_with(existing));
    }

    let row = appointment::insert_appointment(&mut *conn, Uuid::new_v4(), booking, Utc::now())
        .await
        .map_err(classify)?;
    appointment::claim_slots(&mut *conn, row.id, booking)
        .await
        .map_err(classify)?;

    row.try_into()
}

/// Loads, validates and applies a transition on an open transaction.
async fn transition_locked(conn: &mut PgConnection, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment> {
    let mut current: Appointment = appointment::lock_appointment(&mut *conn, id)
        .await
        .map_err(classify)?
        .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?
        .try_into()?;

    current.transition_to(to, Utc::now())?;

    let row = appointment::update_status(&mut *conn, id, to, current.updated_at)
        .await
        .map_err(classify)?;
    if !to.occupies_calendar() {
        appointment::release_slots(&mut *conn, id)
            .await
            .map_err(classify)?;
    }

    row.try_into()
}

#[async_trait]
impl SchoolDirectory for PgStore {
    async fn find_school(&self, school_id: Uuid) -> BookingResult<Option<School>> {
        let row = school::get_school_by_id(&self.pool, school_id)
            .await
            .map_err(classify)?;
        Ok(row.map(School::from))
    }

    async fn find_template(&self, school_id: Uuid) -> BookingResult<Option<WorkingHoursTemplate>> {
        template::get_template_by_school_id(&self.pool, school_id)
            .await
            .map_err(classify)?
            .map(WorkingHoursTemplate::try_from)
            .transpose()
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        appointment::get_appointment_by_id(&self.pool, id)
            .await
            .map_err(classify)?
            .map(Appointment::try_from)
            .transpose()
    }

    async fn list_appointments(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>> {
        let rows = appointment::list_appointments(&self.pool, school_id, date)
            .await
            .map_err(classify)?;
        into_appointments(rows)
    }

    async fn list_occupying(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>> {
        let rows = appointment::list_occupying(&self.pool, school_id, date)
            .await
            .map_err(classify)?;
        into_appointments(rows)
    }

    async fn insert_if_free(&self, booking: NewAppointment) -> BookingResult<Appointment> {
        let mut tx = self.pool.begin().await.map_err(|e| classify(e.into()))?;

        // Dropping `tx` on any early return rolls the attempt back.
        let created = insert_checked(&mut *tx, &booking).await?;

        tx.commit().await.map_err(|e| classify(e.into()))?;
        debug!("Committed appointment {} with {} slot claims", created.id, booking.slot_starts.len());
        Ok(created)
    }

    async fn transition(&self, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment> {
        let mut tx = self.pool.begin().await.map_err(|e| classify(e.into()))?;
        let updated = transition_locked(&mut *tx, id, to).await?;
        tx.commit().await.map_err(|e| classify(e.into()))?;
        Ok(updated)
    }

    async fn reschedule(&self, id: Uuid, replacement: NewAppointment) -> BookingResult<Rescheduled> {
        let mut tx = self.pool.begin().await.map_err(|e| classify(e.into()))?;

        let previous = transition_locked(&mut *tx, id, AppointmentStatus::Rescheduled).await?;
        let appointment = insert_checked(&mut *tx, &replacement).await?;

        tx.commit().await.map_err(|e| classify(e.into()))?;
        Ok(Rescheduled {
            previous,
            appointment,
        })
    }
}
