use axum::http::{HeaderName, HeaderValue, StatusCode};
use chrono::{Days, Utc};
use fake::{Fake, faker::lorem::en::Sentence};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::models::{
    appointment::{Appointment, AppointmentStatus},
    template::WorkingHoursTemplate,
};
use uuid::Uuid;

use crate::test_utils::{TestContext, future_date, hm};

fn user_header() -> HeaderName {
    HeaderName::from_static("x-user-id")
}

async fn book(ctx: &TestContext, start: &str, end: &str) -> Appointment {
    let response = ctx
        .server
        .post("/api/appointments")
        .json(&ctx.booking(future_date(), start, end))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn create_returns_scheduled_appointment() {
    let ctx = TestContext::new().await;
    let notes: String = Sentence(3..8).fake();
    let mut body = ctx.booking(future_date(), "10:00", "11:00");
    body["notes"] = json!(notes);

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(user_header(), HeaderValue::from_static("nurse-42"))
        .json(&body)
        .await;

    response.assert_status(StatusCode::CREATED);
    let appointment: Appointment = response.json();
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(appointment.created_by, "nurse-42");
    assert_eq!(appointment.school_id, ctx.school_id);
    assert_eq!(appointment.start_time, hm(10, 0));
    assert_eq!(appointment.end_time, hm(11, 0));
    assert_eq!(appointment.notes.as_deref(), Some(notes.trim()));

    let raw: Value = ctx
        .server
        .get(&format!("/api/appointments/{}", appointment.id))
        .await
        .json();
    assert_eq!(raw["start_time"], "10:00");
    assert_eq!(raw["status"], "scheduled");
}

#[tokio::test]
async fn missing_user_header_records_anonymous() {
    let ctx = TestContext::new().await;

    let appointment = book(&ctx, "09:00", "10:00").await;

    assert_eq!(appointment.created_by, "anonymous");
}

#[tokio::test]
async fn overlapping_booking_is_a_conflict() {
    let ctx = TestContext::with_template(WorkingHoursTemplate::new(hm(8, 0), hm(16, 0), 30)).await;
    book(&ctx, "10:00", "11:00").await;

    let response = ctx
        .server
        .post("/api/appointments")
        .json(&ctx.booking(future_date(), "09:30", "10:30"))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["conflicting_start"], "10:00");
    assert_eq!(body["conflicting_end"], "11:00");
    assert_eq!(body["requested_start"], "09:30");
    assert_eq!(body["school_id"], ctx.school_id.to_string());
}

#[tokio::test]
async fn invalid_bookings_are_bad_requests() {
    let ctx = TestContext::new().await;
    let yesterday = Utc::now().date_naive() - Days::new(1);

    let cases = vec![
        ctx.booking(future_date(), "10:30", "11:30"),
        ctx.booking(future_date(), "11:00", "10:00"),
        ctx.booking(yesterday, "10:00", "11:00"),
        {
            let mut body = ctx.booking(future_date(), "10:00", "11:00");
            body["expected_students"] = json!(0);
            body
        },
    ];

    for case in cases {
        let response = ctx.server.post("/api/appointments").json(&case).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["kind"], "validation", "case: {case}");
    }
}

#[tokio::test]
async fn booking_for_unknown_school_is_not_found() {
    let ctx = TestContext::new().await;
    let mut body = ctx.booking(future_date(), "10:00", "11:00");
    body["school_id"] = json!(Uuid::new_v4());

    let response = ctx.server.post("/api/appointments").json(&body).await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_releases_the_slot() {
    let ctx = TestContext::new().await;
    let booked = book(&ctx, "13:00", "14:00").await;

    let response = ctx
        .server
        .delete(&format!("/api/appointments/{}", booked.id))
        .await;
    response.assert_status_ok();
    let cancelled: Appointment = response.json();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    // Second cancel hits a terminal status.
    let again = ctx
        .server
        .delete(&format!("/api/appointments/{}", booked.id))
        .await;
    again.assert_status(StatusCode::CONFLICT);
    let body: Value = again.json();
    assert_eq!(body["kind"], "invalid_transition");
    assert_eq!(body["from"], "cancelled");

    let rebooked = book(&ctx, "13:00", "14:00").await;
    assert_ne!(rebooked.id, booked.id);
}

#[tokio::test]
async fn complete_keeps_the_slot_taken() {
    let ctx = TestContext::new().await;
    let booked = book(&ctx, "08:00", "09:00").await;

    let response = ctx
        .server
        .post(&format!("/api/appointments/{}/complete", booked.id))
        .await;
    response.assert_status_ok();
    let completed: Appointment = response.json();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    ctx.server
        .post("/api/appointments")
        .json(&ctx.booking(future_date(), "08:00", "09:00"))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn reschedule_returns_replacement() {
    let ctx = TestContext::new().await;
    let booked = book(&ctx, "10:00", "11:00").await;
    let new_date = future_date() + Days::new(1);

    let response = ctx
        .server
        .patch(&format!("/api/appointments/{}", booked.id))
        .add_header(user_header(), HeaderValue::from_static("coordinator-7"))
        .json(&json!({
            "date": new_date,
            "start_time": "14:00",
            "end_time": "16:00",
        }))
        .await;

    response.assert_status_ok();
    let moved: Appointment = response.json();
    assert_eq!(moved.date, new_date);
    assert_eq!(moved.start_time, hm(14, 0));
    assert_eq!(moved.end_time, hm(16, 0));
    assert_eq!(moved.rescheduled_from, Some(booked.id));
    assert_eq!(moved.created_by, "coordinator-7");

    let previous: Appointment = ctx
        .server
        .get(&format!("/api/appointments/{}", booked.id))
        .await
        .json();
    assert_eq!(previous.status, AppointmentStatus::Rescheduled);
}

#[tokio::test]
async fn reschedule_onto_a_taken_slot_is_a_conflict() {
    let ctx = TestContext::new().await;
    let first = book(&ctx, "09:00", "10:00").await;
    book(&ctx, "11:00", "12:00").await;

    let response = ctx
        .server
        .patch(&format!("/api/appointments/{}", first.id))
        .json(&json!({ "start_time": "11:00", "end_time": "12:00" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let unchanged: Appointment = ctx
        .server
        .get(&format!("/api/appointments/{}", first.id))
        .await
        .json();
    assert_eq!(unchanged.status, AppointmentStatus::Scheduled);
}

#[tokio::test]
async fn list_returns_every_status_in_start_order() {
    let ctx = TestContext::new().await;
    let late = book(&ctx, "14:00", "15:00").await;
    let early = book(&ctx, "08:00", "09:00").await;
    ctx.server
        .delete(&format!("/api/appointments/{}", late.id))
        .await
        .assert_status_ok();

    let listed: Vec<Appointment> = ctx
        .server
        .get(&format!("/api/schools/{}/appointments", ctx.school_id))
        .add_query_param("date", future_date())
        .await
        .json();

    let summary: Vec<(Uuid, AppointmentStatus)> = listed.iter().map(|a| (a.id, a.status)).collect();
    assert_eq!(
        summary,
        vec![
            (early.id, AppointmentStatus::Scheduled),
            (late.id, AppointmentStatus::Cancelled),
        ]
    );
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let ctx = TestContext::new().await;
    let id = Uuid::new_v4();

    ctx.server
        .get(&format!("/api/appointments/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    ctx.server
        .delete(&format!("/api/appointments/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    ctx.server
        .post(&format!("/api/appointments/{}/complete", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn simultaneous_requests_book_once() {
    let ctx = TestContext::new().await;
    let body = ctx.booking(future_date(), "10:00", "11:00");

    let (a, b, c, d) = tokio::join!(
        ctx.server.post("/api/appointments").json(&body).into_future(),
        ctx.server.post("/api/appointments").json(&body).into_future(),
        ctx.server.post("/api/appointments").json(&body).into_future(),
        ctx.server.post("/api/appointments").json(&body).into_future(),
    );

    let statuses = [a.status_code(), b.status_code(), c.status_code(), d.status_code()];
    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!((created, conflicts), (1, 3));
}
