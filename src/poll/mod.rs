//! Playback polling

pub mod diff;
pub mod engine;
pub mod retained;

pub use diff::UpdateKind;
pub use engine::{DEFAULT_POLL_INTERVAL, PollEngine, PollHandle, PollUpdate};
pub use retained::RetainedSession;
