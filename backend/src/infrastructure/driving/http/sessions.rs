use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::aggregates::{Session, SessionSummary, SessionView};
use crate::domain::entities::{Label, Message};
use crate::domain::value_objects::{FrameId, MessageId, Sender, SessionId};
use crate::infrastructure::driving::http::ApiError;
use crate::infrastructure::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub objective: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
}

fn empty_metadata() -> Value {
    json!({})
}

#[derive(Debug, Deserialize)]
pub struct AppendMessageRequest {
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub frame_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AppendLabelRequest {
    pub message_id: String,
    pub label_type: String,
    #[serde(default)]
    pub label_data: Value,
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/messages", post(append_message))
        .route("/sessions/:id/labels", post(append_label))
        .route("/sessions/:id/end", post(end_session))
}

async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .ledger
        .create_session(payload.objective, payload.metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.ledger.list_sessions().await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let view = state.ledger.snapshot(&SessionId::from_string(id)).await?;
    Ok(Json(view))
}

async fn append_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state
        .ledger
        .append_message(
            &SessionId::from_string(id),
            payload.sender,
            payload.content,
            payload.frame_id.map(FrameId::new),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn append_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AppendLabelRequest>,
) -> Result<(StatusCode, Json<Label>), ApiError> {
    let label = state
        .ledger
        .append_label(
            &SessionId::from_string(id),
            &MessageId::from_string(payload.message_id),
            payload.label_type,
            payload.label_data,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(label)))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let session = state.ledger.end_session(&SessionId::from_string(id)).await?;
    Ok(Json(session))
}
