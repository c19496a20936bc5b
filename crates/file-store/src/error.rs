//! File store error types.

/// Errors from the remote file store.
#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid API key")]
    InvalidKey,

    #[error("upload target response carried no url")]
    MissingUploadUrl,
}

impl FileStoreError {
    /// HTTP status of an API rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FileStoreError::Api { status, .. } => Some(*status),
            FileStoreError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
