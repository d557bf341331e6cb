use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Label, Message};
use crate::domain::value_objects::{SessionId, SessionStatus};

/// Elapsed recording time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionDuration {
    Seconds(f64),
    Ongoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub message_count: usize,
    pub label_count: usize,
    /// Distinct frames referenced by messages
    pub frame_count: usize,
    pub duration: SessionDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub labels: Vec<Label>,
}

/// Immutable read model handed to routing and export code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub objective: String,
    pub metadata: serde_json::Value,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub messages: Vec<MessageView>,
    pub stats: SessionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub objective: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stats: SessionStats,
}
