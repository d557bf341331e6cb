use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the server produces frames for its observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// A single server clock broadcasts to every observer
    #[default]
    Live,
    /// Each connection steps through its own bounded frame sequence
    Playback,
}

/// One delivered frame. The payload encoding belongs to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "base64_serde")]
    pub payload: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Messages sent from an observer to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Attribute subsequent commands to a session
    StartRecording { session_id: String },
    StopRecording,
    /// A scientist command, stamped server-side with the observed frame
    Command { content: String },
    Pause,
    Resume,
    Seek { index: usize },
    Replay,
    SkipToEnd,
}

/// Messages sent from the server to an observer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        observer_id: String,
        mode: StreamMode,
        frame_rate: u32,
        width: u32,
        height: u32,
        #[serde(default)]
        frame_count: Option<usize>,
    },
    Frame(FrameData),
    RecordingStarted { session_id: String },
    RecordingStopped {
        #[serde(default)]
        session_id: Option<String>,
    },
    /// A message was appended to the recording session
    MessageRecorded {
        message_id: String,
        sender: String,
        #[serde(default)]
        frame_id: Option<u64>,
    },
    /// Synthetic robot reply to a command
    Response {
        content: String,
        #[serde(default)]
        frame_id: Option<u64>,
        recorded: bool,
    },
    PlaybackState {
        index: usize,
        frame_id: u64,
        playing: bool,
        frame_count: usize,
    },
    Error {
        message: String,
        #[serde(default)]
        code: Option<String>,
    },
}

/// Helper module for base64 encoding/decoding with serde
mod base64_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use base64::{engine::general_purpose::STANDARD, Engine};
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
