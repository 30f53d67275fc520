//! # Availability Handlers
//!
//! Read-only view of a school's day. The snapshot is advisory: it is computed
//! without locking, so a slot shown as free may be taken by the time a booking
//! is submitted. The booking endpoint re-checks and answers 409 in that case.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDate;
use serde::Deserialize;
use slotbook_core::{availability, models::time_slot::AvailabilityResponse};
use std::sync::Arc;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// Query parameters for the availability endpoint
///
/// * `date` - ISO-8601 calendar date to inspect
/// * `compact` - merge runs of adjacent booked slots into one entry (default: false)
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,

    #[serde(default)]
    pub compact: bool,
}

/// Returns the slot lattice for a school and date with each slot marked free or booked
///
/// # Errors
///
/// * 404 - the school is unknown
/// * 400 - the school's stored template is invalid
/// * 500 - storage failed
#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<ApiState>>,
    Path(school_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let mut slots = state
        .availability
        .compute_availability(school_id, query.date)
        .await?;

    if query.compact {
        slots = availability::compact(slots);
    }

    Ok(Json(AvailabilityResponse {
        school_id,
        date: query.date,
        slots,
    }))
}
