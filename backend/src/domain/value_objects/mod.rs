pub mod session_id;
pub mod message_id;
pub mod label_id;
pub mod observer_id;
pub mod frame_id;
pub mod sender;
pub mod session_status;

pub use session_id::SessionId;
pub use message_id::MessageId;
pub use label_id::LabelId;
pub use observer_id::ObserverId;
pub use frame_id::FrameId;
pub use sender::Sender;
pub use session_status::SessionStatus;
