mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{file_settings, send};
use recorder_server::infrastructure::{build_state, driving::build_router};

#[tokio::test]
async fn test_sessions_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let app = build_router(build_state(file_settings(dir.path())).await.unwrap());
    let (_, session) = send(
        &app,
        "POST",
        "/api/sessions",
        Some(json!({"objective": "Pick up the cube", "metadata": {"rig": 2}})),
    )
    .await;
    let id = session["id"].as_str().unwrap().to_string();
    let (_, command) = send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/messages"),
        Some(json!({"sender": "scientist", "content": "grab", "frame_id": 3})),
    )
    .await;
    send(
        &app,
        "POST",
        &format!("/api/sessions/{id}/labels"),
        Some(json!({"message_id": command["id"], "label_type": "success", "label_data": true})),
    )
    .await;
    send(&app, "POST", &format!("/api/sessions/{id}/end"), None).await;
    let (_, before) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    drop(app);

    assert!(dir.path().join("ledger.json").exists());

    let app = build_router(build_state(file_settings(dir.path())).await.unwrap());
    let (status, after) = send(&app, "GET", &format!("/api/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_corrupt_ledger_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ledger.json"), "{ truncated").unwrap();

    let app = build_router(build_state(file_settings(dir.path())).await.unwrap());
    let (status, list) = send(&app, "GET", "/api/sessions", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}
