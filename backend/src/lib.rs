//! Frame-synchronized interaction recorder.
//!
//! Streams synthetic camera frames to observers, records scientist commands
//! and robot replies stamped with the frame each observer was looking at,
//! and persists sessions for dataset export.

pub mod domain;
pub mod application;
pub mod infrastructure;
