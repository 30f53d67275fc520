use crate::models::DbTemplate;
use slotbook_core::models::template::WorkingHoursTemplate;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_template_by_school_id(pool: &Pool<Postgres>, school_id: Uuid) -> Result<Option<DbTemplate>> {
    let template = sqlx::query_as::<_, DbTemplate>(
        r#"
        SELECT school_id, day_start, day_end, slot_minutes, blackout_dates, remainder_policy
        FROM working_hours_templates
        WHERE school_id = $1
        "#,
    )
    .bind(school_id)
    .fetch_optional(pool)
    .await?;

    if template.is_none() {
        tracing::debug!("No working hours template stored for school {}", school_id);
    }

    Ok(template)
}

/// Stores a school's template, replacing any previous one.
pub async fn upsert_template(pool: &Pool<Postgres>, template: &WorkingHoursTemplate) -> Result<DbTemplate> {
    let school_id = template
        .school_id
        .ok_or_else(|| eyre::eyre!("Template without school_id cannot be stored"))?;
    let slot_minutes = i32::try_from(template.slot_minutes)?;

    let row = sqlx::query_as::<_, DbTemplate>(
        r#"
        INSERT INTO working_hours_templates
            (school_id, day_start, day_end, slot_minutes, blackout_dates, remainder_policy)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (school_id) DO UPDATE SET
            day_start = EXCLUDED.day_start,
            day_end = EXCLUDED.day_end,
            slot_minutes = EXCLUDED.slot_minutes,
            blackout_dates = EXCLUDED.blackout_dates,
            remainder_policy = EXCLUDED.remainder_policy
        RETURNING school_id, day_start, day_end, slot_minutes, blackout_dates, remainder_policy
        "#,
    )
    .bind(school_id)
    .bind(template.day_start)
    .bind(template.day_end)
    .bind(slot_minutes)
    .bind(&template.blackout_dates)
    .bind(template.remainder.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}
