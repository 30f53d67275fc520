pub mod memory;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod store;

pub mod mock;

use eyre::Result;
use slotbook_core::errors::BookingError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type DbPool = Pool<Postgres>;

pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// SQLSTATE codes that signal a race or a contended resource rather than a
/// bad statement: unique violation, serialization failure, deadlock, lock not
/// available, query cancelled (statement/lock timeout).
const TRANSIENT_SQLSTATES: &[&str] = &["23505", "40001", "40P01", "55P03", "57014"];

/// Sorts a repository failure into the booking error taxonomy.
pub fn classify(report: eyre::Report) -> BookingError {
    let transient = match report.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.iter().any(|state| *state == code)),
        Some(sqlx::Error::PoolTimedOut) | Some(sqlx::Error::Io(_)) => true,
        _ => false,
    };

    if transient {
        BookingError::Transient(report.to_string())
    } else {
        BookingError::Database(report)
    }
}
