use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{LabelId, MessageId, SessionId};

/// Annotation attached to exactly one message of the same session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Label {
    pub fn new(
        session_id: SessionId,
        message_id: MessageId,
        kind: String,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: LabelId::generate(),
            session_id,
            message_id,
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}
