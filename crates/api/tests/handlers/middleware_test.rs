use axum::{
    body::to_bytes,
    http::{HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::Response,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use slotbook_api::middleware::error_handling::map_error;
use slotbook_core::{
    errors::BookingError,
    models::{appointment::AppointmentStatus, time_slot::Interval},
};
use uuid::Uuid;

use crate::test_utils::{TestContext, future_date, hm};

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn screening_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

#[rstest]
#[case(BookingError::NotFound("School".into()), StatusCode::NOT_FOUND, "not_found")]
#[case(BookingError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation")]
#[case(BookingError::Transient("reset".into()), StatusCode::SERVICE_UNAVAILABLE, "transient")]
#[case(BookingError::Database(eyre::eyre!("pool closed")), StatusCode::INTERNAL_SERVER_ERROR, "database")]
#[case(
    BookingError::Internal(Box::new(std::io::Error::other("boom"))),
    StatusCode::INTERNAL_SERVER_ERROR,
    "internal"
)]
#[tokio::test]
async fn maps_error_kinds_to_status(
    #[case] error: BookingError,
    #[case] status: StatusCode,
    #[case] kind: &str,
) {
    let response = map_error(error);

    assert_eq!(response.status(), status);
    let body = body_json(response).await;
    assert_eq!(body["kind"], kind);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn internal_details_are_not_exposed() {
    let response = map_error(BookingError::Database(eyre::eyre!("password authentication failed")));

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn conflict_body_names_both_intervals() {
    let school_id = Uuid::new_v4();
    let response = map_error(BookingError::Conflict {
        school_id,
        date: screening_day(),
        requested: Interval::new(hm(9, 30), hm(10, 30)),
        conflicting: Interval::new(hm(10, 0), hm(11, 0)),
    });

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["school_id"], school_id.to_string());
    assert_eq!(body["date"], "2025-03-10");
    assert_eq!(body["requested_start"], "09:30");
    assert_eq!(body["requested_end"], "10:30");
    assert_eq!(body["conflicting_start"], "10:00");
    assert_eq!(body["conflicting_end"], "11:00");
}

#[tokio::test]
async fn exhausted_retries_ask_the_client_to_retry() {
    let response = map_error(BookingError::ServiceUnavailable {
        school_id: Uuid::new_v4(),
        date: screening_day(),
        requested: Interval::new(hm(10, 0), hm(11, 0)),
        attempts: 4,
    });

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "1");
    let body = body_json(response).await;
    assert_eq!(body["kind"], "service_unavailable");
    assert_eq!(body["attempts"], 4);
}

#[tokio::test]
async fn invalid_transition_is_a_conflict() {
    let id = Uuid::new_v4();
    let response = map_error(BookingError::InvalidTransition {
        id,
        from: AppointmentStatus::Completed,
        to: AppointmentStatus::Cancelled,
    });

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["appointment_id"], id.to_string());
    assert_eq!(body["from"], "completed");
    assert_eq!(body["to"], "cancelled");
}

#[tokio::test]
async fn blank_user_header_falls_back_to_anonymous() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(HeaderName::from_static("x-user-id"), HeaderValue::from_static("   "))
        .json(&ctx.booking(future_date(), "10:00", "11:00"))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["created_by"], "anonymous");
}

#[tokio::test]
async fn oversized_user_header_is_rejected() {
    let ctx = TestContext::new().await;
    let long_id = "u".repeat(200);

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(&long_id).unwrap(),
        )
        .json(&ctx.booking(future_date(), "10:00", "11:00"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_the_store() {
    let ctx = TestContext::new().await;

    let body: Value = ctx.server.get("/health").await.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");

    let version: Value = ctx.server.get("/version").await.json();
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}
