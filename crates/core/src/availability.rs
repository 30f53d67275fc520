//! # Availability Calculator
//!
//! An availability snapshot for a school and date is the slot lattice minus
//! every interval held by an occupying appointment. A slot is unavailable
//! iff `slot.start < appt.end && appt.start < slot.end` for some appointment.
//!
//! Snapshots are advisory: they are computed without any lock and may be
//! stale by the time a booking is submitted. The allocator re-checks.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::Appointment,
        time_slot::{Interval, TimeSlot},
    },
    slots,
    store::{BookingStore, SchoolDirectory},
    templates::TemplateResolver,
};

/// Marks every slot that overlaps a booked interval as unavailable.
pub fn mark_unavailable(mut lattice: Vec<TimeSlot>, booked: &[Interval]) -> Vec<TimeSlot> {
    for slot in &mut lattice {
        let interval = slot.interval();
        slot.available = !booked.iter().any(|b| interval.overlaps(b));
    }
    lattice
}

/// Merges runs of adjacent unavailable slots into a single entry.
pub fn compact(slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    let mut merged: Vec<TimeSlot> = Vec::with_capacity(slots.len());
    for slot in slots {
        match merged.last_mut() {
            Some(last) if !last.available && !slot.available && last.end_time == slot.start_time => {
                last.end_time = slot.end_time;
            }
            _ => merged.push(slot),
        }
    }
    merged
}

#[derive(Clone)]
pub struct AvailabilityCalculator {
    store: Arc<dyn BookingStore>,
    directory: Arc<dyn SchoolDirectory>,
    templates: TemplateResolver,
}

impl AvailabilityCalculator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        directory: Arc<dyn SchoolDirectory>,
        templates: TemplateResolver,
    ) -> Self {
        Self {
            store,
            directory,
            templates,
        }
    }

    /// Point-in-time free/busy view of the school's day, ordered by start.
    pub async fn compute_availability(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<TimeSlot>> {
        self.directory
            .find_school(school_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("School with ID {} not found", school_id)))?;

        let template = self.templates.get_template(school_id).await?;
        let occupying = self.store.list_occupying(school_id, date).await?;
        let booked: Vec<Interval> = occupying
            .iter()
            .filter(|a| a.occupies_calendar())
            .map(Appointment::interval)
            .collect();

        let snapshot = mark_unavailable(slots::generate_slots(&template, date), &booked);
        debug!(
            "Availability for school {} on {}: {} slots, {} booked intervals",
            school_id,
            date,
            snapshot.len(),
            booked.len()
        );

        Ok(snapshot)
    }
}
