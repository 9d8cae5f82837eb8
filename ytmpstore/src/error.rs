//! Error types for the track store

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur when using the track store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was closed; no further operations are possible
    #[error("track store is closed")]
    Closed,

    /// Underlying SQLite failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
