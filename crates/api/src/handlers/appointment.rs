use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::Deserialize;
use slotbook_core::{
    errors::BookingError,
    models::appointment::{Appointment, CreateAppointmentRequest, RescheduleAppointmentRequest},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::CreatedBy, error_handling::AppError},
};

#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub date: NaiveDate,
}

/// Books an appointment. 201 with the scheduled appointment, 409 when the
/// interval overlaps an existing booking.
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    CreatedBy(created_by): CreatedBy,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state
        .allocator
        .create_appointment(payload, &created_by)
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .store
        .get_appointment(id)
        .await?
        .ok_or_else(|| BookingError::NotFound(format!("Appointment with ID {} not found", id)))?;

    Ok(Json(appointment))
}

/// Every appointment of the school on the date, all statuses, by start time.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    Path(school_id): Path<Uuid>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    if state.directory.find_school(school_id).await?.is_none() {
        return Err(AppError(BookingError::NotFound(format!(
            "School with ID {} not found",
            school_id
        ))));
    }

    let appointments = state.store.list_appointments(school_id, query.date).await?;
    debug!(
        "Listed {} appointments for school {} on {}",
        appointments.len(),
        school_id,
        query.date
    );

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.allocator.cancel_appointment(id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.allocator.complete_appointment(id).await?;
    Ok(Json(appointment))
}

/// Moves a scheduled appointment and returns its replacement. The old
/// appointment stays on record with status `rescheduled`.
#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    CreatedBy(created_by): CreatedBy,
    Json(payload): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let moved = state
        .allocator
        .reschedule_appointment(id, payload, &created_by)
        .await?;

    Ok(Json(moved.appointment))
}
