use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};

use crate::application::commands::{DatasetFilter, ExportResult};
use crate::application::export::DatasetStatistics;
use crate::domain::value_objects::SessionId;
use crate::infrastructure::driving::http::ApiError;
use crate::infrastructure::AppState;

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/export", post(export_all))
        .route("/export/statistics", get(statistics))
        .route("/sessions/:id/export", post(export_session))
}

async fn export_all(State(state): State<AppState>) -> Result<Json<ExportResult>, ApiError> {
    Ok(Json(state.exports.export_all().await?))
}

async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExportResult>, ApiError> {
    let result = state
        .exports
        .export_session(&SessionId::from_string(id))
        .await?;
    Ok(Json(result))
}

async fn statistics(
    State(state): State<AppState>,
    Query(filter): Query<DatasetFilter>,
) -> Json<DatasetStatistics> {
    Json(state.exports.statistics(&filter).await)
}
