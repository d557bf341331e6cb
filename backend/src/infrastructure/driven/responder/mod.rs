pub mod scripted_responder;

pub use scripted_responder::ScriptedResponder;
