use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use shared::{ClientMessage, ServerMessage, StreamMode};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::commands::{IssueCommand, IssueCommandResult, StampSource};
use crate::application::streaming::{FramePlayer, FrameReceiver, PlaybackPosition, StreamHub};
use crate::domain::entities::Message;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{FrameId, ObserverId, SessionId};
use crate::infrastructure::AppState;

/// Server messages waiting to be written to one socket
const OUTBOUND_QUEUE: usize = 128;
/// Commands waiting behind the robot's think time
const COMMAND_QUEUE: usize = 16;

/// WebSocket endpoint for observers
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One observer connection. Frames, command replies and control replies all
/// funnel through a single outbound queue so the socket has one writer.
struct Connection {
    observer_id: ObserverId,
    state: AppState,
    player: Option<Arc<FramePlayer>>,
    outbound: mpsc::Sender<ServerMessage>,
    commands: mpsc::Sender<String>,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut receiver) = socket.split();
    let observer_id = ObserverId::new();
    let cancel = CancellationToken::new();

    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);

    // Registered in both modes so recording attribution works the same way
    let hub_frames = state.hub.register(observer_id);

    let (player, frames) = match state.settings.stream.mode {
        StreamMode::Live => (None, hub_frames),
        StreamMode::Playback => {
            let (frame_tx, frame_rx) = mpsc::channel(state.settings.stream.observer_queue);
            match FramePlayer::new(
                state.settings.stream.playback_frames,
                state.settings.stream.frame_rate,
                Arc::clone(&state.renderer),
                Some(frame_tx),
            ) {
                Ok(player) => (Some(Arc::new(player)), frame_rx),
                Err(e) => {
                    error!(observer = %observer_id, error = %e, "cannot start playback");
                    state.hub.unregister(&observer_id);
                    return;
                }
            }
        }
    };

    info!(observer = %observer_id, mode = ?state.settings.stream.mode, "observer connected");

    // Live stamping reads what this writer reported, not what sits in a queue
    let receipts = player.is_none().then(|| DeliveryReceipts {
        hub: Arc::clone(&state.hub),
        observer_id,
    });
    let writer = tokio::spawn(write_outbound(sink, out_rx, receipts, cancel.clone()));
    let forwarder = tokio::spawn(forward_frames(frames, out_tx.clone(), cancel.clone()));

    let connection = Arc::new(Connection {
        observer_id,
        state,
        player,
        outbound: out_tx,
        commands: cmd_tx,
    });
    let worker = tokio::spawn(run_commands(Arc::clone(&connection), cmd_rx, cancel.clone()));

    connection.send_welcome().await;
    if let Some(player) = &connection.player {
        let position = player.replay_from_start();
        connection.send(playback_state(position)).await;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            incoming = receiver.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => connection.handle_client_message(message).await,
                        Err(e) => {
                            warn!(observer = %observer_id, error = %e, "unparseable client message");
                            connection
                                .send_error(format!("invalid message: {e}"), "bad-request")
                                .await;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!(observer = %observer_id, "observer disconnected");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(observer = %observer_id, error = %e, "websocket error");
                    break;
                }
            },
        }
    }

    // Deregister before the next tick can reach this observer
    connection.state.hub.unregister(&observer_id);
    if let Some(player) = &connection.player {
        player.stop();
    }
    cancel.cancel();
    let tasks = [
        ("writer", writer),
        ("frame forwarder", forwarder),
        ("command worker", worker),
    ];
    reap_tasks(observer_id, tasks).await;
    debug!(observer = %observer_id, "connection cleaned up");
}

/// Wait for every connection task. A task that panicked or was aborted is
/// logged; returns how many did.
async fn reap_tasks<const N: usize>(
    observer_id: ObserverId,
    tasks: [(&'static str, JoinHandle<()>); N],
) -> usize {
    let mut failed = 0;
    for (task, handle) in tasks {
        if let Err(e) = handle.await {
            warn!(observer = %observer_id, task, error = %e, "connection task failed");
            failed += 1;
        }
    }
    failed
}

/// Reports frames handed to the socket back to the hub
struct DeliveryReceipts {
    hub: Arc<StreamHub>,
    observer_id: ObserverId,
}

async fn write_outbound(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    receipts: Option<DeliveryReceipts>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to encode server message");
                continue;
            }
        };
        if let (Some(receipts), ServerMessage::Frame(frame)) = (&receipts, &message) {
            receipts
                .hub
                .mark_delivered(&receipts.observer_id, FrameId::new(frame.frame_id));
        }
        if sink.send(WsMessage::Text(json)).await.is_err() {
            cancel.cancel();
            break;
        }
    }
    let _ = sink.close().await;
}

async fn forward_frames(
    mut frames: FrameReceiver,
    outbound: mpsc::Sender<ServerMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if outbound.send(ServerMessage::Frame(frame.to_wire())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// Commands run one at a time in arrival order, off the read loop, so the
/// robot's think time never stalls frame delivery.
async fn run_commands(
    connection: Arc<Connection>,
    mut commands: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        let content = tokio::select! {
            _ = cancel.cancelled() => break,
            content = commands.recv() => match content {
                Some(content) => content,
                None => break,
            },
        };
        connection.issue_command(content).await;
    }
}

fn playback_state(position: PlaybackPosition) -> ServerMessage {
    ServerMessage::PlaybackState {
        index: position.index,
        frame_id: position.frame_id.value(),
        playing: position.playing,
        frame_count: position.frame_count,
    }
}

fn message_recorded(message: &Message) -> ServerMessage {
    ServerMessage::MessageRecorded {
        message_id: message.id.to_string(),
        sender: message.sender.as_str().to_string(),
        frame_id: message.frame_id.map(|id| id.value()),
    }
}

fn error_code(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::SessionNotFound(_) => "session-not-found",
        LedgerError::MessageNotFound { .. } => "message-not-found",
        LedgerError::SessionClosed(_) => "session-closed",
        LedgerError::Storage(_) => "storage",
    }
}

impl Connection {
    async fn send(&self, message: ServerMessage) {
        if self.outbound.send(message).await.is_err() {
            debug!(observer = %self.observer_id, "outbound queue closed");
        }
    }

    async fn send_error(&self, message: impl Into<String>, code: &str) {
        self.send(ServerMessage::Error {
            message: message.into(),
            code: Some(code.to_string()),
        })
        .await;
    }

    async fn send_welcome(&self) {
        let stream = &self.state.settings.stream;
        let (width, height) = self.state.renderer.dimensions();
        self.send(ServerMessage::Welcome {
            observer_id: self.observer_id.to_string(),
            mode: stream.mode,
            frame_rate: stream.frame_rate,
            width,
            height,
            frame_count: self.player.as_ref().map(|p| p.frame_count()),
        })
        .await;
    }

    async fn handle_client_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::StartRecording { session_id } => {
                self.start_recording(SessionId::from_string(session_id)).await
            }
            ClientMessage::StopRecording => {
                let stopped = self.state.hub.stop_recording(&self.observer_id);
                self.send(ServerMessage::RecordingStopped {
                    session_id: stopped.map(|id| id.to_string()),
                })
                .await;
            }
            ClientMessage::Command { content } => {
                if self.commands.send(content).await.is_err() {
                    debug!(observer = %self.observer_id, "command worker gone");
                }
            }
            ClientMessage::Pause => self.control(|p| p.pause()).await,
            ClientMessage::Resume => self.control(|p| p.resume()).await,
            ClientMessage::Seek { index } => self.control(|p| p.seek(index)).await,
            ClientMessage::Replay => self.control(|p| p.replay_from_start()).await,
            ClientMessage::SkipToEnd => self.control(|p| p.skip_to_end()).await,
        }
    }

    async fn start_recording(&self, session_id: SessionId) {
        match self.state.ledger.snapshot(&session_id).await {
            Ok(view) if view.status.is_terminal() => {
                let err = LedgerError::SessionClosed(session_id);
                self.send_error(err.to_string(), error_code(&err)).await;
            }
            Ok(_) => {
                self.state
                    .hub
                    .start_recording(&self.observer_id, session_id.clone());
                info!(observer = %self.observer_id, session = %session_id, "recording started");
                self.send(ServerMessage::RecordingStarted {
                    session_id: session_id.to_string(),
                })
                .await;
            }
            Err(err) => self.send_error(err.to_string(), error_code(&err)).await,
        }
    }

    async fn control<F>(&self, apply: F)
    where
        F: FnOnce(&FramePlayer) -> PlaybackPosition,
    {
        match &self.player {
            Some(player) => {
                let position = apply(player.as_ref());
                self.send(playback_state(position)).await;
            }
            None => {
                self.send_error("playback controls need playback mode", "unsupported")
                    .await
            }
        }
    }

    async fn issue_command(&self, content: String) {
        let command = IssueCommand {
            observer_id: self.observer_id,
            content,
        };
        let source = match &self.player {
            Some(player) => StampSource::Playback(player.as_ref()),
            None => StampSource::Live,
        };

        match self.state.commands.handle(command, source).await {
            Ok(result) => self.send_command_result(result).await,
            Err(err) => {
                warn!(observer = %self.observer_id, error = %err, "command not recorded");
                self.send_error(err.to_string(), error_code(&err)).await;
            }
        }
    }

    async fn send_command_result(&self, result: IssueCommandResult) {
        if let Some(command) = &result.command {
            self.send(message_recorded(command)).await;
        }
        self.send(ServerMessage::Response {
            content: result.response,
            frame_id: result.response_frame.map(|id| id.value()),
            recorded: result.response_message.is_some(),
        })
        .await;
        if let Some(response) = &result.response_message {
            self.send(message_recorded(response)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reap_reports_panicked_task() {
        let tasks = [
            ("writer", tokio::spawn(async {})),
            ("frame forwarder", tokio::spawn(async { panic!("forwarder blew up") })),
            ("command worker", tokio::spawn(async {})),
        ];

        assert_eq!(reap_tasks(ObserverId::new(), tasks).await, 1);
    }

    #[tokio::test]
    async fn test_reap_waits_for_clean_tasks() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tasks = [("worker", tokio::spawn(async move { token.cancelled().await }))];
        cancel.cancel();

        assert_eq!(reap_tasks(ObserverId::new(), tasks).await, 0);
    }
}
