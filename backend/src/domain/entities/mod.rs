pub mod frame;
pub mod message;
pub mod label;

pub use frame::Frame;
pub use message::Message;
pub use label::Label;
