use thiserror::Error;

use crate::domain::value_objects::{MessageId, SessionId};

/// Failures of the durable store behind the ledger
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Errors surfaced by ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("session '{0}' not found")]
    SessionNotFound(SessionId),

    #[error("message '{message_id}' not found in session '{session_id}'")]
    MessageNotFound {
        session_id: SessionId,
        message_id: MessageId,
    },

    #[error("session '{0}' is completed and no longer accepts messages")]
    SessionClosed(SessionId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Lookup failures the routing layer maps to "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::SessionNotFound(_) | LedgerError::MessageNotFound { .. }
        )
    }
}

/// Errors raised when building frame producers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("a frame sequence needs at least one frame")]
    EmptySequence,
}
