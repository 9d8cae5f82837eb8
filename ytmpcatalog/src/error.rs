//! Error types for the catalog client

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur when talking to the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error reading the auth headers file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog rejected the session cookies
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The auth headers file is missing required material
    #[error("invalid auth headers: {0}")]
    InvalidAuth(String),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A response did not have the shape the parser expects
    #[error("unexpected response shape: {0}")]
    BadResponse(String),
}

impl CatalogError {
    pub fn invalid_auth(msg: impl Into<String>) -> Self {
        Self::InvalidAuth(msg.into())
    }

    pub fn bad_response(msg: impl Into<String>) -> Self {
        Self::BadResponse(msg.into())
    }
}

impl From<CatalogError> for ytmpsource::SourceError {
    fn from(err: CatalogError) -> Self {
        use ytmpsource::SourceError;

        match err {
            CatalogError::Unauthorized(msg) => SourceError::Unauthorized(msg),
            CatalogError::InvalidAuth(msg) => SourceError::Unauthorized(msg),
            CatalogError::Api { status: 404, message } => SourceError::NotFound(message),
            other => SourceError::Temporary(other.to_string()),
        }
    }
}
