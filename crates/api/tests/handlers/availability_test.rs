use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;
use slotbook_core::models::{template::WorkingHoursTemplate, time_slot::AvailabilityResponse};
use uuid::Uuid;

use crate::test_utils::{TestContext, future_date, hm};

fn busy(response: &AvailabilityResponse) -> Vec<(String, String)> {
    response
        .slots
        .iter()
        .filter(|s| !s.available)
        .map(|s| {
            (
                s.start_time.format("%H:%M").to_string(),
                s.end_time.format("%H:%M").to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn empty_day_has_eight_free_hourly_slots() {
    let ctx = TestContext::new().await;
    let date = future_date();

    let response = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .add_query_param("date", date)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0]["start_time"], "08:00");
    assert_eq!(slots[0]["end_time"], "09:00");
    assert_eq!(slots[7]["start_time"], "15:00");
    assert_eq!(slots[7]["end_time"], "16:00");
    assert!(slots.iter().all(|s| s["available"] == true));
    assert_eq!(body["school_id"], ctx.school_id.to_string());
}

#[tokio::test]
async fn booked_hour_is_reported_unavailable() {
    let ctx = TestContext::new().await;
    let date = future_date();

    ctx.server
        .post("/api/appointments")
        .json(&ctx.booking(date, "10:00", "11:00"))
        .await
        .assert_status(StatusCode::CREATED);

    let response: AvailabilityResponse = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .add_query_param("date", date)
        .await
        .json();

    assert_eq!(busy(&response), vec![("10:00".to_string(), "11:00".to_string())]);
}

#[tokio::test]
async fn compact_mode_merges_adjacent_bookings() {
    let ctx = TestContext::with_template(WorkingHoursTemplate::new(hm(8, 0), hm(12, 0), 30)).await;
    let date = future_date();

    for (start, end) in [("09:00", "09:30"), ("09:30", "10:30")] {
        ctx.server
            .post("/api/appointments")
            .json(&ctx.booking(date, start, end))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response: AvailabilityResponse = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .add_query_param("date", date)
        .add_query_param("compact", true)
        .await
        .json();

    assert_eq!(busy(&response), vec![("09:00".to_string(), "10:30".to_string())]);
    // 08:00, 08:30, merged 09:00-10:30, 10:30, 11:00, 11:30
    assert_eq!(response.slots.len(), 6);
}

#[tokio::test]
async fn blackout_date_has_no_slots() {
    let date = future_date();
    let template = WorkingHoursTemplate::new(hm(8, 0), hm(16, 0), 60).with_blackout_dates([date]);
    let ctx = TestContext::with_template(template).await;

    let response: AvailabilityResponse = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .add_query_param("date", date)
        .await
        .json();

    assert!(response.slots.is_empty());
}

#[tokio::test]
async fn unknown_school_is_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .get(&format!("/api/schools/{}/availability", Uuid::new_v4()))
        .add_query_param("date", future_date())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn missing_date_is_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_stored_template_is_a_bad_request() {
    let ctx = TestContext::with_template(WorkingHoursTemplate::new(hm(16, 0), hm(8, 0), 60)).await;

    let response = ctx
        .server
        .get(&format!("/api/schools/{}/availability", ctx.school_id))
        .add_query_param("date", future_date())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["kind"], "validation");
}
