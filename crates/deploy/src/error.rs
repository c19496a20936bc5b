//! Deploy error types.

use craftdeploy_file_store::FileStoreError;

/// Structural failures that abort an upload phase.
///
/// Per-artifact failures are reported in the results instead.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("no downloaded artifacts for server {server}")]
    NoArtifacts { server: String },

    #[error("file store error: {0}")]
    FileStore(#[from] FileStoreError),
}
