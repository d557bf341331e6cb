pub mod error;
pub mod sessions;
pub mod export;

pub use error::ApiError;
pub use export::export_routes;
pub use sessions::session_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::infrastructure::AppState;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `/health` plus everything under `/api`
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", session_routes().merge(export_routes()))
}
