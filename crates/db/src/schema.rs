use eyre::Result;
use sqlx::{Executor, Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // School directory (maintained by the external admin workflow)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schools (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name VARCHAR(255) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Per-school working hours
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS working_hours_templates (
            school_id UUID PRIMARY KEY REFERENCES schools(id),
            day_start TIME NOT NULL,
            day_end TIME NOT NULL,
            slot_minutes INTEGER NOT NULL,
            blackout_dates DATE[] NOT NULL DEFAULT '{}',
            remainder_policy VARCHAR(32) NOT NULL DEFAULT 'discard',
            CONSTRAINT valid_window CHECK (day_end > day_start),
            CONSTRAINT positive_slot CHECK (slot_minutes > 0),
            CONSTRAINT known_remainder_policy
                CHECK (remainder_policy IN ('discard', 'partial_slot', 'reject'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Appointments are never deleted; status carries their lifecycle
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            school_id UUID NOT NULL REFERENCES schools(id),
            date DATE NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            screening_type VARCHAR(64) NOT NULL,
            expected_students INTEGER NOT NULL,
            status VARCHAR(16) NOT NULL DEFAULT 'scheduled',
            notes TEXT NULL,
            created_by VARCHAR(255) NOT NULL,
            rescheduled_from UUID NULL REFERENCES appointments(id),
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_time_range CHECK (end_time > start_time),
            CONSTRAINT positive_students CHECK (expected_students > 0),
            CONSTRAINT known_status
                CHECK (status IN ('scheduled', 'completed', 'cancelled', 'rescheduled'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // One row per grid slot held by an occupying appointment. The primary
    // key is the storage-level guard against overlapping bookings.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointment_slots (
            school_id UUID NOT NULL,
            date DATE NOT NULL,
            slot_start TIME NOT NULL,
            appointment_id UUID NOT NULL REFERENCES appointments(id),
            PRIMARY KEY (school_id, date, slot_start)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes (several statements, so use the simple query protocol)
    pool.execute(
        r#"
        CREATE INDEX IF NOT EXISTS idx_appointments_school_date ON appointments(school_id, date);
        CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);
        CREATE INDEX IF NOT EXISTS idx_appointment_slots_appointment_id ON appointment_slots(appointment_id);
        "#,
    )
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
