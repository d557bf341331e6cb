use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{FrameId, MessageId, Sender, SessionId};

/// A single event on a session timeline. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Frame the sender was looking at, if any frame had been observed yet
    pub frame_id: Option<FrameId>,
}

impl Message {
    pub fn new(
        session_id: SessionId,
        sender: Sender,
        content: String,
        frame_id: Option<FrameId>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            session_id,
            sender,
            content,
            timestamp: Utc::now(),
            frame_id,
        }
    }
}
