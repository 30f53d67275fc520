//! # Error Handling Middleware
//!
//! Maps booking errors to HTTP status codes and JSON bodies of the form
//! `{"error": <message>, "kind": <snake_case kind>, ...context}`.
//!
//! | Error | Status |
//! |-------|--------|
//! | `Validation` | 400 |
//! | `NotFound` | 404 |
//! | `Conflict`, `InvalidTransition` | 409 |
//! | `Transient`, `ServiceUnavailable` | 503 |
//! | `Database`, `Internal` | 500 |
//!
//! A conflict body names the interval that blocked the request so the caller
//! can re-query availability and pick another slot.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use slotbook_core::{errors::BookingError, models::time_format};
use tracing::error;

/// Application error wrapper that provides HTTP status code mapping
///
/// ```
/// use axum::Json;
/// use slotbook_api::middleware::error_handling::AppError;
/// use slotbook_core::errors::BookingError;
///
/// async fn handler(students: i32) -> Result<Json<i32>, AppError> {
///     if students <= 0 {
///         return Err(AppError(BookingError::Validation("no students".into())));
///     }
///     Ok(Json(students))
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Conflict { .. } => StatusCode::CONFLICT,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn context(&self) -> Map<String, Value> {
        let context = match &self.0 {
            BookingError::Conflict {
                school_id,
                date,
                requested,
                conflicting,
            } => json!({
                "school_id": school_id,
                "date": date,
                "requested_start": time_format::format(&requested.start_time),
                "requested_end": time_format::format(&requested.end_time),
                "conflicting_start": time_format::format(&conflicting.start_time),
                "conflicting_end": time_format::format(&conflicting.end_time),
            }),
            BookingError::ServiceUnavailable {
                school_id,
                date,
                requested,
                attempts,
            } => json!({
                "school_id": school_id,
                "date": date,
                "requested_start": time_format::format(&requested.start_time),
                "requested_end": time_format::format(&requested.end_time),
                "attempts": attempts,
            }),
            BookingError::InvalidTransition { id, from, to } => json!({
                "appointment_id": id,
                "from": from,
                "to": to,
            }),
            _ => Value::Null,
        };

        match context {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage internals stay in the logs.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {:?}", self.0);
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let mut body = self.context();
        body.insert("error".to_string(), Value::String(message));
        body.insert("kind".to_string(), Value::String(self.0.kind().to_string()));

        let mut response = (status, Json(Value::Object(body))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError(err)
    }
}

/// Maps a BookingError straight to an HTTP response
pub fn map_error(err: BookingError) -> Response {
    AppError(err).into_response()
}
