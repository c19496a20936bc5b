//! Upload phase: getting resolved archives into a server's mods directory.
//!
//! The remote file store does not reliably honor directory hints, so every
//! upload is verified by listing and, when it landed in the wrong place,
//! moved.
//!
//! # Pipeline
//!
//! 1. **Prepare**: list the canonical directory, creating it when absent
//! 2. **Dedupe**: delete older versions of each incoming archive ([`resolve_duplicates`])
//! 3. **Place**: upload, verify and relocate one archive at a time ([`PlacementProtocol`])

pub mod duplicates;
pub mod error;
pub mod placement;
pub mod upload;

#[cfg(test)]
pub(crate) mod mock;

pub use duplicates::{base_key, resolve_duplicates};
pub use error::DeployError;
pub use placement::{DirectoryHint, PlacementProtocol};
pub use upload::{UploadPhase, UploadReport};
