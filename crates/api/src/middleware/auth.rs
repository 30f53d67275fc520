//! # Caller Identity
//!
//! Authentication happens upstream. The identity provider forwards an opaque
//! user reference in the `X-User-Id` header, which is recorded as the
//! `created_by` of new appointments.

use axum::{extract::FromRequestParts, http::request::Parts};
use slotbook_core::errors::BookingError;

use super::error_handling::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ANONYMOUS: &str = "anonymous";
const MAX_USER_ID_LEN: usize = 128;

/// Opaque created-by reference taken from `X-User-Id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBy(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CreatedBy
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CreatedBy(ANONYMOUS.to_string()));
        };

        let user_id = raw
            .to_str()
            .map_err(|_| {
                AppError(BookingError::Validation(
                    "X-User-Id header must be printable ASCII".to_string(),
                ))
            })?
            .trim();

        if user_id.is_empty() {
            return Ok(CreatedBy(ANONYMOUS.to_string()));
        }
        if user_id.len() > MAX_USER_ID_LEN {
            return Err(AppError(BookingError::Validation(format!(
                "X-User-Id header must be at most {} characters",
                MAX_USER_ID_LEN
            ))));
        }

        Ok(CreatedBy(user_id.to_string()))
    }
}
