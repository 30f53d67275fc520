use crate::models::DbAppointment;
use chrono::{DateTime, NaiveDate, Utc};
use eyre::Result;
use slotbook_core::models::appointment::{AppointmentStatus, NewAppointment};
use sqlx::{Executor, PgConnection, Pool, Postgres};
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str = "id, school_id, date, start_time, end_time, screening_type, \
     expected_students, status, notes, created_by, rescheduled_from, created_at, updated_at";

pub async fn get_appointment_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

/// Loads an appointment and holds its row lock until the transaction ends.
pub async fn lock_appointment(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(appointment)
}

pub async fn list_appointments(
    pool: &Pool<Postgres>,
    school_id: Uuid,
    date: NaiveDate,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE school_id = $1 AND date = $2
        ORDER BY start_time ASC, created_at ASC
        "#
    ))
    .bind(school_id)
    .bind(date)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Appointments that hold their interval on the calendar.
pub async fn list_occupying<'e, E>(executor: E, school_id: Uuid, date: NaiveDate) -> Result<Vec<DbAppointment>>
where
    E: Executor<'e, Database = Postgres>,
{
    let appointments = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE school_id = $1 AND date = $2 AND status IN ('scheduled', 'completed')
        ORDER BY start_time ASC
        "#
    ))
    .bind(school_id)
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(appointments)
}

pub async fn insert_appointment(
    conn: &mut PgConnection,
    id: Uuid,
    booking: &NewAppointment,
    now: DateTime<Utc>,
) -> Result<DbAppointment> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        INSERT INTO appointments (
            id, school_id, date, start_time, end_time, screening_type,
            expected_students, status, notes, created_by, rescheduled_from,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(booking.school_id)
    .bind(booking.date)
    .bind(booking.interval.start_time)
    .bind(booking.interval.end_time)
    .bind(&booking.screening_type)
    .bind(booking.expected_students)
    .bind(AppointmentStatus::Scheduled.as_str())
    .bind(&booking.notes)
    .bind(&booking.created_by)
    .bind(booking.rescheduled_from)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(appointment)
}

/// Inserts one occupancy row per covered grid slot. A concurrent writer that
/// got there first makes this fail with a unique violation.
pub async fn claim_slots(conn: &mut PgConnection, appointment_id: Uuid, booking: &NewAppointment) -> Result<()> {
    for slot_start in &booking.slot_starts {
        sqlx::query(
            r#"
            INSERT INTO appointment_slots (school_id, date, slot_start, appointment_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(booking.school_id)
        .bind(booking.date)
        .bind(slot_start)
        .bind(appointment_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn release_slots(conn: &mut PgConnection, appointment_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM appointment_slots
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn update_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: AppointmentStatus,
    at: DateTime<Utc>,
) -> Result<DbAppointment> {
    let appointment = sqlx::query_as::<_, DbAppointment>(&format!(
        r#"
        UPDATE appointments
        SET status = $2, updated_at = $3
        WHERE id = $1
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(at)
    .fetch_one(conn)
    .await?;

    Ok(appointment)
}
