// Driving adapters - HTTP API and the observer WebSocket

pub mod http;
pub mod websocket;

pub use http::{api_router, ApiError};
pub use websocket::ws_handler;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::infrastructure::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .merge(api_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
