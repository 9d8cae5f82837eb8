//! Error type shared by the source traits

/// Result type alias for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Errors crossing the catalog / resolver / MPD seams.
///
/// The variants are kinds, not causes: implementations fold their internal
/// error types into the kind that tells the caller how to react. Transient
/// failures may be retried or skipped past; `Unauthorized` never recovers
/// without new credentials.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The catalog rejected the stored credentials
    #[error("catalog rejected credentials: {0}")]
    Unauthorized(String),

    /// Transient failure (network, 5xx, subprocess hiccup)
    #[error("temporary failure: {0}")]
    Temporary(String),

    /// The requested entity does not exist upstream
    #[error("not found: {0}")]
    NotFound(String),

    /// A resolver call exceeded its deadline
    #[error("operation timed out")]
    Timeout,

    /// MPD refused or failed a playlist operation
    #[error("mpd error: {0}")]
    Mpd(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn temporary(msg: impl Into<String>) -> Self {
        Self::Temporary(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn mpd(msg: impl Into<String>) -> Self {
        Self::Mpd(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Temporary(_) | Self::Timeout)
    }
}
