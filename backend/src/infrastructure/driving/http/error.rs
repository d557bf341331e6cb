use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::domain::errors::LedgerError;

/// Ledger failure rendered as `{"error": ...}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            LedgerError::SessionClosed(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::StorageError;
    use crate::domain::value_objects::{MessageId, SessionId};

    #[test]
    fn test_status_mapping() {
        let id = SessionId::from_string("s");
        assert_eq!(
            ApiError(LedgerError::SessionNotFound(id.clone())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(LedgerError::MessageNotFound {
                session_id: id.clone(),
                message_id: MessageId::from_string("m"),
            })
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(LedgerError::SessionClosed(id)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(LedgerError::Storage(StorageError::Task("join".into()))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
