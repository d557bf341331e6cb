// Frame production and fan-out: live clock, bounded playback, observer hub

pub mod timer;
pub mod stream_hub;
pub mod frame_clock;
pub mod frame_player;

pub use timer::{frame_period, TimerSlot};
pub use stream_hub::{FrameReceiver, ObserverStatus, StreamHub};
pub use frame_clock::FrameClock;
pub use frame_player::{FramePlayer, PlaybackPosition};
