use crate::models::DbSchool;
use slotbook_core::models::school::School;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn get_school_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbSchool>> {
    tracing::debug!("Looking up school {}", id);

    let school = sqlx::query_as::<_, DbSchool>(
        r#"
        SELECT id, name, created_at
        FROM schools
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(school)
}

/// Inserts the school or renames an existing one.
pub async fn upsert_school(pool: &Pool<Postgres>, school: &School) -> Result<DbSchool> {
    let row = sqlx::query_as::<_, DbSchool>(
        r#"
        INSERT INTO schools (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, created_at
        "#,
    )
    .bind(school.id)
    .bind(&school.name)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
