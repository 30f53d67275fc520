use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{appointment::AppointmentStatus, time_slot::Interval};

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(
        "Booking conflict: school {school_id} on {date} requested {requested}, which overlaps the existing booking {conflicting}"
    )]
    Conflict {
        school_id: Uuid,
        date: NaiveDate,
        requested: Interval,
        conflicting: Interval,
    },

    #[error("Invalid status transition for appointment {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Transient storage error: {0}")]
    Transient(String),

    #[error(
        "Service unavailable: booking school {school_id} on {date} at {requested} failed after {attempts} attempts, re-query availability before resubmitting"
    )]
    ServiceUnavailable {
        school_id: Uuid,
        date: NaiveDate,
        requested: Interval,
        attempts: u32,
    },

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    /// Transient failures are races or infrastructure hiccups that may
    /// succeed on a fresh attempt. Semantic outcomes never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, BookingError::Transient(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::NotFound(_) => "not_found",
            BookingError::Validation(_) => "validation",
            BookingError::Conflict { .. } => "conflict",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::Transient(_) => "transient",
            BookingError::ServiceUnavailable { .. } => "service_unavailable",
            BookingError::Database(_) => "database",
            BookingError::Internal(_) => "internal",
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
