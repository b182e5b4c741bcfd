//! Catalog database synchronisation

pub mod engine;

pub use engine::{DEFAULT_CHUNK_SIZE, SyncEngine, SyncProgress, SyncResult};
