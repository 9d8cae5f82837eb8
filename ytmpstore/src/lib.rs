//! # YTMPStore
//!
//! Durable mapping `video_id -> (stream_url, title, artist, updated_at)`
//! backed by a single-file SQLite database.
//!
//! The store is the only mutable state shared between the sync engine
//! (writer) and the streaming proxy (reader, writer on URL refresh). All
//! synchronization happens here: callers never need an external lock, and
//! records come back as immutable snapshots.

pub mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::{TrackRecord, TrackStore};
