//! Persisted daemon state
//!
//! One small JSON file: when the last sync ran, how it went, and when the
//! daemon started. Writes go through a temp file plus rename so a crash can
//! never leave a half-written state behind; a corrupt or missing file reads
//! as "no history".

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ytmpsync::SyncResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonState {
    pub last_sync: Option<DateTime<Utc>>,
    pub last_sync_result: Option<SyncResult>,
    pub started_at: DateTime<Utc>,
}

impl DaemonState {
    /// State of a daemon with no history.
    pub fn fresh() -> Self {
        Self {
            last_sync: None,
            last_sync_result: None,
            started_at: Utc::now(),
        }
    }

    /// Reads the state file. Missing or unreadable files are a fresh start,
    /// never an error; `started_at` is stamped with the current startup
    /// either way.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No previous daemon state");
                return Self::fresh();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read daemon state, starting fresh");
                return Self::fresh();
            }
        };

        match serde_json::from_str::<DaemonState>(&raw) {
            Ok(mut state) => {
                state.started_at = Utc::now();
                state
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt daemon state, starting fresh");
                Self::fresh()
            }
        }
    }

    /// Writes the state atomically: temp file in the same directory, fsync,
    /// rename over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(self).context("serializing daemon state")?;

        let mut file = File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, path)
            .with_context(|| format!("renaming {} over {}", tmp.display(), path.display()))?;

        Ok(())
    }
}
