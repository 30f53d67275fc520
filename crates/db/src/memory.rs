//! # In-Memory Booking Store
//!
//! Single-instance implementation of the storage traits. Writes for a
//! (school, date) pair are serialized by a per-key async mutex; the overlap
//! re-check and the insert both happen while that key is held. A reschedule
//! that moves across dates takes both keys in sorted order.
//!
//! Status changes (cancel, complete) do not take the per-key lock: they only
//! ever flip a status under the appointment map's write lock.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use slotbook_core::{
    errors::{BookingError, BookingResult},
    models::{
        appointment::{Appointment, AppointmentStatus, NewAppointment, Rescheduled},
        school::School,
        template::WorkingHoursTemplate,
    },
    store::{BookingStore, SchoolDirectory},
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

type DayKey = (Uuid, NaiveDate);

/// Directory contents loaded at start-up when no database is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub schools: Vec<School>,
    #[serde(default)]
    pub templates: Vec<WorkingHoursTemplate>,
}

impl Seed {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read seed file {}", path.display()))?;
        let seed = serde_json::from_str(&raw)
            .wrap_err_with(|| format!("Invalid seed file {}", path.display()))?;
        Ok(seed)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    schools: RwLock<HashMap<Uuid, School>>,
    templates: RwLock<HashMap<Uuid, WorkingHoursTemplate>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
    day_locks: Mutex<HashMap<DayKey, Arc<Mutex<()>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_seed(seed: Seed) -> Result<Self> {
        let store = Self::new();
        for school in seed.schools {
            store.add_school(school).await;
        }
        for template in seed.templates {
            let school_id = template
                .school_id
                .ok_or_else(|| eyre::eyre!("Seed template without school_id"))?;
            template
                .validate()
                .wrap_err_with(|| format!("Invalid template for school {}", school_id))?;
            store.put_template(template).await;
        }

        info!(
            "Loaded in-memory directory with {} schools",
            store.schools.read().await.len()
        );
        Ok(store)
    }

    pub async fn add_school(&self, school: School) {
        self.schools.write().await.insert(school.id, school);
    }

    /// Stores a school-specific template. Templates without a school id are ignored.
    pub async fn put_template(&self, template: WorkingHoursTemplate) {
        if let Some(school_id) = template.school_id {
            self.templates.write().await.insert(school_id, template);
        }
    }

    async fn lock_day(&self, key: DayKey) -> OwnedMutexGuard<()> {
        let day_lock = {
            let mut locks = self.day_locks.lock().await;
            // Only the map holds an idle lock; holders and waiters keep a clone.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key).or_default().clone()
        };
        day_lock.lock_owned().await
    }

    /// Locks every key in ascending order so that two reschedules touching
    /// the same pair of days cannot deadlock.
    async fn lock_days(&self, mut keys: Vec<DayKey>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock_day(key).await);
        }
        guards
    }

    fn occupying_on(appointments: &HashMap<Uuid, Appointment>, school_id: Uuid, date: NaiveDate) -> Vec<&Appointment> {
        appointments
            .values()
            .filter(|a| a.school_id == school_id && a.date == date && a.occupies_calendar())
            .collect()
    }
}

#[async_trait]
impl SchoolDirectory for MemoryStore {
    async fn find_school(&self, school_id: Uuid) -> BookingResult<Option<School>> {
        Ok(self.schools.read().await.get(&school_id).cloned())
    }

    async fn find_template(&self, school_id: Uuid) -> BookingResult<Option<WorkingHoursTemplate>> {
        Ok(self.templates.read().await.get(&school_id).cloned())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get_appointment(&self, id: Uuid) -> BookingResult<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_appointments(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut day: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.school_id == school_id && a.date == date)
            .cloned()
            .collect();
        day.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(day)
    }

    async fn list_occupying(&self, school_id: Uuid, date: NaiveDate) -> BookingResult<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut day: Vec<Appointment> = Self::occupying_on(&appointments, school_id, date)
            .into_iter()
            .cloned()
            .collect();
        day.sort_by_key(|a| a.start_time);
        Ok(day)
    }

    async fn insert_if_free(&self, booking: NewAppointment) -> BookingResult<Appointment> {
        let _day = self.lock_day((booking.school_id, booking.date)).await;

        {
            let appointments = self.appointments.read().await;
            let occupying = Self::occupying_on(&appointments, booking.school_id, booking.date);
            if let Some(existing) = booking.find_conflict(occupying) {
                return Err(booking.conflict_with(existing));
            }
        }

        let appointment = booking.into_appointment(Uuid::new_v4(), Utc::now());
        self.appointments
            .write()
            .await
            .insert(appointment.id, appointment.clone());

        debug!("Stored appointment {} in memory", appointment.id);
        Ok(appointment)
    }

    async fn transition(&self, id: Uuid, to: AppointmentStatus) -> BookingResult<Appointment> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&id)
            .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

        appointment.transition_to(to, Utc::now())?;
        Ok(appointment.clone())
    }

    async fn reschedule(&self, id: Uuid, replacement: NewAppointment) -> BookingResult<Rescheduled> {
        let current_key = {
            let appointments = self.appointments.read().await;
            let current = appointments
                .get(&id)
                .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;
            (current.school_id, current.date)
        };
        let _days = self
            .lock_days(vec![current_key, (replacement.school_id, replacement.date)])
            .await;

        let mut appointments = self.appointments.write().await;

        let mut previous = appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;
        let now = Utc::now();
        previous.transition_to(AppointmentStatus::Rescheduled, now)?;

        // The old booking releases its interval as part of the move.
        let occupying = Self::occupying_on(&appointments, replacement.school_id, replacement.date)
            .into_iter()
            .filter(|a| a.id != id);
        if let Some(existing) = replacement.find_conflict(occupying) {
            return Err(replacement.conflict_with(existing));
        }

        let appointment = replacement.into_appointment(Uuid::new_v4(), now);
        appointments.insert(previous.id, previous.clone());
        appointments.insert(appointment.id, appointment.clone());

        Ok(Rescheduled {
            previous,
            appointment,
        })
    }
}
