//! Wire protocol spoken between the recorder server and its observers.

pub mod protocol;

pub use protocol::{ClientMessage, FrameData, ServerMessage, StreamMode};
