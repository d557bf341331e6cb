pub mod session;
pub mod session_view;

pub use session::Session;
pub use session_view::{MessageView, SessionDuration, SessionStats, SessionSummary, SessionView};
