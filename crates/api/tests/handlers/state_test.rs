use std::collections::HashMap;

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;
use serde_json::Value;
use slotbook_api::{StoreBackend, app, build_state, config::ApiConfig};
use uuid::Uuid;

use crate::test_utils::future_date;

fn config_with(vars: HashMap<&'static str, String>) -> ApiConfig {
    ApiConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[test_log::test(tokio::test)]
async fn seed_file_populates_the_memory_store() {
    let school_id = Uuid::new_v4();
    let seed = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(
        seed.path(),
        format!(
            r#"{{
                "schools": [{{"id": "{school_id}", "name": "Oakwood Middle School"}}],
                "templates": [{{
                    "school_id": "{school_id}",
                    "day_start": "09:00",
                    "day_end": "12:00",
                    "slot_minutes": 45,
                    "remainder": "partial_slot"
                }}]
            }}"#
        ),
    )
    .unwrap();

    let config = config_with(HashMap::from([(
        "SEED_FILE",
        seed.path().display().to_string(),
    )]));
    let state = build_state(&config).await.unwrap();
    assert_eq!(state.backend, StoreBackend::Memory);

    let server = TestServer::new(app(state)).unwrap();
    let response = server
        .get(&format!("/api/schools/{}/availability", school_id))
        .add_query_param("date", future_date())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let starts: Vec<&str> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot["start_time"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["09:00", "09:45", "10:30", "11:15"]);
    assert_eq!(body["slots"][3]["end_time"], "12:00");
}

#[tokio::test]
async fn schools_outside_the_seed_are_unknown() {
    let state = build_state(&config_with(HashMap::new())).await.unwrap();
    let server = TestServer::new(app(state)).unwrap();

    server
        .get(&format!("/api/schools/{}/appointments", Uuid::new_v4()))
        .add_query_param("date", future_date())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreadable_seed_file_fails_startup() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");

    let config = config_with(HashMap::from([("SEED_FILE", missing.display().to_string())]));

    assert!(build_state(&config).await.is_err());
}
