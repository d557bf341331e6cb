// Driven adapters - implementations of the application ports

pub mod atomic_file;
pub mod persistence;
pub mod render;
pub mod responder;
pub mod export;
