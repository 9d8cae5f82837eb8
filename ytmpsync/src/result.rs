//! Sync outcome reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one sync pass.
///
/// `success` holds exactly when `errors` is empty. Track-level resolver
/// failures only bump `tracks_failed`; playlist-level failures (fetch, MPD
/// write, nothing resolved) also append to `errors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    pub playlists_synced: usize,
    pub playlists_failed: usize,
    pub tracks_added: usize,
    pub tracks_failed: usize,
    pub duration_seconds: f64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl SyncResult {
    /// Fresh all-zero result; counters are filled in by the engine.
    pub(crate) fn new() -> Self {
        Self {
            success: false,
            playlists_synced: 0,
            playlists_failed: 0,
            tracks_added: 0,
            tracks_failed: 0,
            duration_seconds: 0.0,
            errors: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    /// Seals the result: stamps duration and completion time, derives
    /// `success` from the accumulated errors.
    pub(crate) fn finish(mut self, started: std::time::Instant) -> Self {
        self.duration_seconds = started.elapsed().as_secs_f64();
        self.completed_at = Utc::now();
        self.success = self.errors.is_empty();
        self
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}
