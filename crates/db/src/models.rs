use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use slotbook_core::{
    errors::BookingError,
    models::{
        appointment::Appointment, school::School, template::WorkingHoursTemplate,
    },
};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbSchool {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbSchool> for School {
    fn from(row: DbSchool) -> Self {
        School {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbTemplate {
    pub school_id: Uuid,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub slot_minutes: i32,
    pub blackout_dates: Vec<NaiveDate>,
    pub remainder_policy: String,
}

impl TryFrom<DbTemplate> for WorkingHoursTemplate {
    type Error = BookingError;

    fn try_from(row: DbTemplate) -> Result<Self, Self::Error> {
        let slot_minutes = u32::try_from(row.slot_minutes).map_err(|_| {
            BookingError::Validation(format!(
                "Template for school {} has a negative slot duration",
                row.school_id
            ))
        })?;

        Ok(WorkingHoursTemplate::new(row.day_start, row.day_end, slot_minutes)
            .for_school(row.school_id)
            .with_blackout_dates(row.blackout_dates)
            .with_remainder(row.remainder_policy.parse()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub school_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub screening_type: String,
    pub expected_students: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub rescheduled_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = BookingError;

    fn try_from(row: DbAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: row.id,
            school_id: row.school_id,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            screening_type: row.screening_type,
            expected_students: row.expected_students,
            status: row.status.parse()?,
            notes: row.notes,
            created_by: row.created_by,
            rescheduled_from: row.rescheduled_from,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
