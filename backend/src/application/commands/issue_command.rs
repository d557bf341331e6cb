use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::ledger::SessionLedger;
use crate::application::ports::RobotResponder;
use crate::application::streaming::{FramePlayer, StreamHub};
use crate::domain::entities::Message;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{FrameId, ObserverId, Sender, SessionId};

/// Scientist command issued from one observer connection
#[derive(Debug, Clone)]
pub struct IssueCommand {
    pub observer_id: ObserverId,
    pub content: String,
}

/// Where "the current frame" comes from for this observer
#[derive(Clone, Copy)]
pub enum StampSource<'a> {
    /// Last frame the hub delivered to the observer
    Live,
    /// The cursor of the observer's own player
    Playback(&'a FramePlayer),
}

#[derive(Debug, Clone)]
pub struct IssueCommandResult {
    /// Session the exchange was attributed to, if the observer was recording
    pub session_id: Option<SessionId>,
    pub command: Option<Message>,
    pub response: String,
    pub response_frame: Option<FrameId>,
    pub response_message: Option<Message>,
}

/// Records a scientist command and the synthetic robot reply, each stamped
/// with the frame the observer had at the moment it was constructed.
pub struct IssueCommandHandler {
    ledger: Arc<SessionLedger>,
    hub: Arc<StreamHub>,
    responder: Arc<dyn RobotResponder>,
}

impl IssueCommandHandler {
    pub fn new(
        ledger: Arc<SessionLedger>,
        hub: Arc<StreamHub>,
        responder: Arc<dyn RobotResponder>,
    ) -> Self {
        Self {
            ledger,
            hub,
            responder,
        }
    }

    fn stamp(&self, observer_id: &ObserverId, source: StampSource<'_>) -> Option<FrameId> {
        match source {
            StampSource::Live => self.hub.last_frame_for(observer_id),
            StampSource::Playback(player) => Some(player.current_frame().frame_id),
        }
    }

    pub async fn handle(
        &self,
        command: IssueCommand,
        source: StampSource<'_>,
    ) -> Result<IssueCommandResult, LedgerError> {
        let command_frame = self.stamp(&command.observer_id, source);
        let session_id = self.hub.session_for(&command.observer_id);

        let recorded_command = match &session_id {
            Some(session_id) => Some(
                self.ledger
                    .append_message(session_id, Sender::Scientist, command.content.clone(), command_frame)
                    .await?,
            ),
            None => None,
        };

        let response = self.responder.respond(&command.content).await;
        let response_frame = self.stamp(&command.observer_id, source);

        let response_message = match &session_id {
            Some(session_id) => match self
                .ledger
                .append_message(session_id, Sender::Robot, response.clone(), response_frame)
                .await
            {
                Ok(message) => Some(message),
                Err(LedgerError::Storage(e)) => return Err(LedgerError::Storage(e)),
                Err(e) => {
                    warn!(session = %session_id, error = %e, "robot response not recorded");
                    None
                }
            },
            None => None,
        };

        debug!(
            observer = %command.observer_id,
            recorded = session_id.is_some(),
            command_frame = ?command_frame,
            response_frame = ?response_frame,
            "command handled"
        );

        Ok(IssueCommandResult {
            session_id,
            command: recorded_command,
            response,
            response_frame,
            response_message,
        })
    }
}
