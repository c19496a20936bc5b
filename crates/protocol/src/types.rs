use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mod-loading runtime a game server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Fabric,
    Quilt,
    NeoForge,
    Forge,
    Unknown,
}

impl Loader {
    /// Lower-case name as the resolver and the panel spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::Fabric => "fabric",
            Loader::Quilt => "quilt",
            Loader::NeoForge => "neoforge",
            Loader::Forge => "forge",
            Loader::Unknown => "unknown",
        }
    }

    /// Parses a loader name case-insensitively. Unrecognized names map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "fabric" => Loader::Fabric,
            "quilt" => Loader::Quilt,
            "neoforge" => Loader::NeoForge,
            "forge" => Loader::Forge,
            _ => Loader::Unknown,
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loader and game version of one server, derived per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub loader: Loader,
    pub game_version: String,
}

/// What the pipeline knows about a server before detection runs.
///
/// `mod_loader` and `version` are pre-detected values supplied out-of-band;
/// when present they win over anything found in `environment`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerContext {
    pub environment: HashMap<String, String>,
    pub mod_loader: Option<Loader>,
    pub version: Option<String>,
}

impl ServerContext {
    pub fn from_environment(environment: HashMap<String, String>) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }
}

/// Lifecycle of a queued package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Queued,
    Installing,
    Installed,
    Error,
}

impl EntryStatus {
    /// Status only ever moves forward: queued → installing → {installed | error}.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Queued, EntryStatus::Installing)
                | (EntryStatus::Installing, EntryStatus::Installed)
                | (EntryStatus::Installing, EntryStatus::Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EntryStatus::Installed | EntryStatus::Error)
    }
}

/// One requested package in a server's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub slug: String,
    pub title: String,
    pub status: EntryStatus,
    pub queued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueEntry {
    /// Creates a fresh `queued` entry stamped with the current time.
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            status: EntryStatus::Queued,
            queued_at: Utc::now(),
            installed_at: None,
            error: None,
        }
    }
}

/// A package binary produced by the resolver, held in memory until upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub bytes: Vec<u8>,
    pub size: u64,
}

impl Artifact {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self {
            name: name.into(),
            bytes,
            size,
        }
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            name: self.name.clone(),
            size: self.size,
        }
    }
}

// Keep blobs out of log lines.
impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}

/// Name and size of an artifact, for responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Success,
    Error,
}

/// Where an artifact ended up after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementLocation {
    /// Found in the canonical directory right after upload.
    Uploaded,
    /// Landed in the store root and was moved into the canonical directory.
    Moved,
    /// Uploaded, but its final location could not be confirmed.
    Ambiguous,
}

/// Outcome of uploading one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub file: String,
    pub status: DeployStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PlacementLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentResult {
    /// Verified under the canonical directory.
    pub fn placed(file: impl Into<String>, location: PlacementLocation) -> Self {
        Self {
            file: file.into(),
            status: DeployStatus::Success,
            location: Some(location),
            error: None,
        }
    }

    /// Upload went through but placement could not be confirmed.
    pub fn ambiguous(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: DeployStatus::Error,
            location: Some(PlacementLocation::Ambiguous),
            error: Some(error.into()),
        }
    }

    /// Nothing usable reached the store.
    pub fn failed(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            status: DeployStatus::Error,
            location: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeployStatus::Success
    }
}
