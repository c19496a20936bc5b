//! Installer error types.

use std::time::Duration;

/// Structural failures of an installation run.
///
/// Per-entry resolver failures are not errors at this level; they are
/// recorded on the queue entry and counted in the report.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("no queued mods for server {server}")]
    NoQueue { server: String },

    #[error("failed to create working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of one resolver invocation.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("failed to start resolver `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resolver I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("resolver timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}
