//! SQLite-backed track store

use crate::error::{Result, StoreError};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// One stored track mapping.
///
/// A snapshot: mutating it has no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRecord {
    pub video_id: String,
    /// Upstream audio URL. Always populated, but ephemeral; check
    /// [`is_stale_at`](TrackRecord::is_stale_at) before trusting it.
    pub stream_url: String,
    pub title: String,
    /// Display artist; empty means unknown.
    pub artist: String,
    /// Seconds since epoch of the last write touching this row.
    pub updated_at: i64,
}

impl TrackRecord {
    /// Whether the stored URL is older than `max_age` as of `now`
    /// (seconds since epoch).
    pub fn is_stale_at(&self, now: i64, max_age: Duration) -> bool {
        now.saturating_sub(self.updated_at) > max_age.as_secs() as i64
    }

    /// [`is_stale_at`](TrackRecord::is_stale_at) against the current clock.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.is_stale_at(Utc::now().timestamp(), max_age)
    }
}

/// Durable `video_id -> track` map on a single SQLite file.
///
/// WAL journaling lets concurrent readers proceed while one writer is
/// active; within this process the connection itself is serialized behind a
/// mutex, which is never held across anything but the statement itself.
#[derive(Debug)]
pub struct TrackStore {
    conn: Mutex<Option<Connection>>,
}

impl TrackStore {
    /// Opens (creating if missing) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL for concurrent readers; journal_mode returns the new mode
        conn.query_row("PRAGMA journal_mode=WAL", [], |_row| Ok(()))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS track (
                video_id   TEXT PRIMARY KEY,
                stream_url TEXT NOT NULL,
                title      TEXT NOT NULL,
                artist     TEXT NOT NULL DEFAULT '',
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Supports expiry scans by age
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_track_updated_at
                 ON track (updated_at)",
            [],
        )?;

        debug!(path = %path.display(), "Track store opened");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Inserts or replaces the mapping for `video_id`, stamping `updated_at`
    /// with the current time.
    pub fn upsert(&self, video_id: &str, stream_url: &str, title: &str, artist: &str) -> Result<()> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "INSERT INTO track (video_id, stream_url, title, artist, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(video_id) DO UPDATE SET
                 stream_url = excluded.stream_url,
                 title = excluded.title,
                 artist = excluded.artist,
                 updated_at = excluded.updated_at",
            params![video_id, stream_url, title, artist, Utc::now().timestamp()],
        )?;

        Ok(())
    }

    /// Fetches the record for `video_id`, or `None` if unknown.
    pub fn get(&self, video_id: &str) -> Result<Option<TrackRecord>> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let record = conn
            .query_row(
                "SELECT video_id, stream_url, title, artist, updated_at
                 FROM track WHERE video_id = ?1",
                [video_id],
                |row| {
                    Ok(TrackRecord {
                        video_id: row.get(0)?,
                        stream_url: row.get(1)?,
                        title: row.get(2)?,
                        artist: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// Replaces only the stream URL (and `updated_at`) of an existing row.
    ///
    /// A missing `video_id` is a no-op, not an error: refreshing a URL must
    /// never create a row with empty display metadata.
    pub fn update_stream_url(&self, video_id: &str, new_url: &str) -> Result<()> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let changed = conn.execute(
            "UPDATE track SET stream_url = ?2, updated_at = ?3 WHERE video_id = ?1",
            params![video_id, new_url, Utc::now().timestamp()],
        )?;

        if changed == 0 {
            debug!(video_id, "update_stream_url on unknown id ignored");
        }

        Ok(())
    }

    /// Overrides `updated_at` for an existing row.
    ///
    /// Maintenance hook for expiry tooling; a missing row is a no-op.
    pub fn set_updated_at(&self, video_id: &str, updated_at: i64) -> Result<()> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            "UPDATE track SET updated_at = ?2 WHERE video_id = ?1",
            params![video_id, updated_at],
        )?;

        Ok(())
    }

    /// Number of stored mappings.
    pub fn count(&self) -> Result<u64> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM track", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Flushes and releases the database. Every call after this fails with
    /// [`StoreError::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut guard = self.conn.lock().unwrap();
        match guard.take() {
            Some(conn) => conn.close().map_err(|(_conn, e)| StoreError::Sqlite(e)),
            None => Err(StoreError::Closed),
        }
    }
}
