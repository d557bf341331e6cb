#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::path::Path;
use tower::ServiceExt;

use recorder_server::infrastructure::Settings;

/// In-memory ledger, instant robot, small frames
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.storage.ephemeral = true;
    settings.interaction.response_delay_ms = 0;
    settings.stream.width = 16;
    settings.stream.height = 12;
    settings
}

pub fn file_settings(data_dir: &Path) -> Settings {
    let mut settings = test_settings();
    settings.storage.ephemeral = false;
    settings.storage.data_dir = data_dir.to_path_buf();
    settings
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
