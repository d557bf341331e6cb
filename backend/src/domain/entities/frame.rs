use chrono::{DateTime, Utc};
use shared::FrameData;

use crate::domain::value_objects::FrameId;

/// One unit of visual output. Frames are never persisted; messages only
/// keep their id.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub timestamp: DateTime<Utc>,
    pub payload: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(id: FrameId, payload: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            payload,
            width,
            height,
        }
    }

    pub fn to_wire(&self) -> FrameData {
        FrameData {
            frame_id: self.id.value(),
            timestamp: self.timestamp,
            payload: self.payload.clone(),
            width: self.width,
            height: self.height,
        }
    }
}
