use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::aggregates::session_view::{
    MessageView, SessionDuration, SessionStats, SessionSummary, SessionView,
};
use crate::domain::entities::{Label, Message};
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{FrameId, MessageId, Sender, SessionId, SessionStatus};

/// Recording session aggregate root
///
/// Owns its messages (in append order) and the labels annotating them.
/// Mutated only by appends and by the single `end` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub objective: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    labels: Vec<Label>,
}

impl Session {
    /// Create a new active session with an empty timeline
    pub fn new(objective: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            id: SessionId::generate(),
            objective: objective.into(),
            metadata,
            created_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Active,
            messages: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn has_message(&self, message_id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == message_id)
    }

    /// Append a message to the timeline. Completed sessions are closed.
    pub fn append_message(
        &mut self,
        sender: Sender,
        content: impl Into<String>,
        frame_id: Option<FrameId>,
    ) -> Result<Message, LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::SessionClosed(self.id.clone()));
        }
        let message = Message::new(self.id.clone(), sender, content.into(), frame_id);
        self.messages.push(message.clone());
        Ok(message)
    }

    /// Annotate an existing message. Labels are accepted after completion.
    pub fn append_label(
        &mut self,
        message_id: &MessageId,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Label, LedgerError> {
        if !self.has_message(message_id) {
            return Err(LedgerError::MessageNotFound {
                session_id: self.id.clone(),
                message_id: message_id.clone(),
            });
        }
        let label = Label::new(self.id.clone(), message_id.clone(), kind.into(), payload);
        self.labels.push(label.clone());
        Ok(label)
    }

    /// `active -> completed`. Returns false when already completed; the
    /// original end timestamp is kept.
    pub fn end(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = SessionStatus::Completed;
        self.ended_at = Some(Utc::now());
        true
    }

    pub fn stats(&self) -> SessionStats {
        let frame_count = self
            .messages
            .iter()
            .filter_map(|m| m.frame_id)
            .collect::<HashSet<_>>()
            .len();

        let duration = match self.ended_at {
            Some(ended) => {
                let millis = (ended - self.created_at).num_milliseconds().max(0);
                SessionDuration::Seconds(millis as f64 / 1000.0)
            }
            None => SessionDuration::Ongoing,
        };

        SessionStats {
            message_count: self.messages.len(),
            label_count: self.labels.len(),
            frame_count,
            duration,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            objective: self.objective.clone(),
            status: self.status,
            created_at: self.created_at,
            ended_at: self.ended_at,
            stats: self.stats(),
        }
    }

    /// Owned, denormalized view: every message with its labels
    pub fn view(&self) -> SessionView {
        let mut labels_by_message: HashMap<&MessageId, Vec<Label>> = HashMap::new();
        for label in &self.labels {
            labels_by_message
                .entry(&label.message_id)
                .or_default()
                .push(label.clone());
        }

        let messages = self
            .messages
            .iter()
            .map(|message| MessageView {
                message: message.clone(),
                labels: labels_by_message.remove(&message.id).unwrap_or_default(),
            })
            .collect();

        SessionView {
            id: self.id.clone(),
            objective: self.objective.clone(),
            metadata: self.metadata.clone(),
            status: self.status,
            created_at: self.created_at,
            ended_at: self.ended_at,
            messages,
            stats: self.stats(),
        }
    }
}
