//! Verified placement of one archive into the canonical directory.
//!
//! States:
//!
//! ```text
//! RESOLVING_TARGET -> UPLOADING -> VERIFYING -> PLACED
//!                                            -> RELOCATING -> PLACED | ambiguous
//!                                            -> UNRESOLVED (ambiguous)
//! ```
//!
//! Target resolution walks the [`DirectoryHint`] chain and stops at the first
//! hint the store answers. The outcome is always confirmed by a listing; the
//! upload response alone is never trusted.

use craftdeploy_file_store::{FileStore, FileStoreError};
use craftdeploy_protocol::panel::FileAttributes;
use craftdeploy_protocol::{DeploymentResult, PlacementLocation};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};

/// One way of telling the store which directory a request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryHint {
    /// `%2Fmods`
    PercentEncoded(String),
    /// `/mods`
    Plain(String),
    /// `mods`
    BareName(String),
    /// No directory parameter: the store root.
    Root,
}

impl DirectoryHint {
    /// Hints that name `canonical_dir`, in the order they are tried.
    pub fn canonical(canonical_dir: &str) -> Vec<DirectoryHint> {
        let absolute = absolute(canonical_dir);
        vec![
            DirectoryHint::PercentEncoded(
                utf8_percent_encode(&absolute, NON_ALPHANUMERIC).to_string(),
            ),
            DirectoryHint::Plain(absolute),
            DirectoryHint::BareName(relative(canonical_dir)),
        ]
    }

    /// Full upload-target chain: the canonical hints, then the root fallback.
    pub fn chain(canonical_dir: &str) -> Vec<DirectoryHint> {
        let mut chain = Self::canonical(canonical_dir);
        chain.push(DirectoryHint::Root);
        chain
    }

    /// Query value sent to the store, `None` for the root.
    pub fn query(&self) -> Option<&str> {
        match self {
            DirectoryHint::PercentEncoded(v)
            | DirectoryHint::Plain(v)
            | DirectoryHint::BareName(v) => Some(v),
            DirectoryHint::Root => None,
        }
    }

    pub fn targets_canonical(&self) -> bool {
        !matches!(self, DirectoryHint::Root)
    }
}

fn absolute(dir: &str) -> String {
    format!("/{}", relative(dir))
}

/// Lists `dir` through the first of its [`DirectoryHint::canonical`] forms
/// that the store accepts.
pub async fn list_hinted(
    store: &dyn FileStore,
    dir: &str,
) -> Result<Vec<FileAttributes>, FileStoreError> {
    let mut last_err = None;
    for hint in DirectoryHint::canonical(dir) {
        match store.list_directory(hint.query()).await {
            Ok(entries) => return Ok(entries),
            Err(e) => {
                debug!(hint = ?hint, error = %e, "hinted listing failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or(FileStoreError::Api {
        status: 404,
        body: String::new(),
    }))
}

fn relative(dir: &str) -> String {
    dir.trim_matches('/').to_string()
}

/// Upload endpoint obtained during target resolution.
#[derive(Debug, Clone)]
struct Target {
    url: String,
    hint: DirectoryHint,
}

/// Where a listing found the uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sighting {
    Canonical,
    Root,
    Nowhere,
}

/// Places archives into one canonical directory of one store.
pub struct PlacementProtocol<'a> {
    store: &'a dyn FileStore,
    canonical_dir: String,
}

impl<'a> PlacementProtocol<'a> {
    pub fn new(store: &'a dyn FileStore, canonical_dir: &str) -> Self {
        Self {
            store,
            canonical_dir: absolute(canonical_dir),
        }
    }

    pub fn canonical_dir(&self) -> &str {
        &self.canonical_dir
    }

    /// Uploads `bytes` as `file_name` and confirms where it ended up.
    pub async fn place(&self, bytes: &[u8], file_name: &str) -> DeploymentResult {
        let server = self.store.server_id();

        let target = match self.resolve_target().await {
            Ok(target) => target,
            Err(e) => {
                warn!(server = %server, file = %file_name, error = %e, "no upload target");
                return DeploymentResult::failed(file_name, format!("no upload target: {e}"));
            }
        };
        debug!(
            server = %server,
            file = %file_name,
            hint = ?target.hint,
            canonical = target.hint.targets_canonical(),
            "upload target resolved"
        );

        if let Err(e) = self.store.upload(&target.url, file_name, bytes).await {
            warn!(server = %server, file = %file_name, error = %e, "upload failed");
            return DeploymentResult::failed(file_name, format!("upload failed: {e}"));
        }

        match self.locate(file_name).await {
            Sighting::Canonical => {
                info!(server = %server, file = %file_name, "placed");
                DeploymentResult::placed(file_name, PlacementLocation::Uploaded)
            }
            Sighting::Root => self.relocate(file_name).await,
            Sighting::Nowhere => {
                warn!(server = %server, file = %file_name, "uploaded file not found");
                DeploymentResult::ambiguous(
                    file_name,
                    format!("uploaded but not found in {} or the store root", self.canonical_dir),
                )
            }
        }
    }

    /// Lists the canonical directory through the first hint that works.
    pub async fn list_canonical(&self) -> Result<Vec<FileAttributes>, FileStoreError> {
        list_hinted(self.store, &self.canonical_dir).await
    }

    async fn resolve_target(&self) -> Result<Target, FileStoreError> {
        let mut last_err = None;
        for hint in DirectoryHint::chain(&self.canonical_dir) {
            match self.store.upload_target(hint.query()).await {
                Ok(url) => return Ok(Target { url, hint }),
                Err(e) => {
                    debug!(hint = ?hint, error = %e, "upload target rejected");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(FileStoreError::MissingUploadUrl))
    }

    async fn locate(&self, file_name: &str) -> Sighting {
        if let Ok(entries) = self.list_canonical().await {
            if contains(&entries, file_name) {
                return Sighting::Canonical;
            }
        }
        match self.store.list_directory(None).await {
            Ok(entries) if contains(&entries, file_name) => Sighting::Root,
            Ok(_) => Sighting::Nowhere,
            Err(e) => {
                warn!(file = %file_name, error = %e, "root listing failed");
                Sighting::Nowhere
            }
        }
    }

    async fn relocate(&self, file_name: &str) -> DeploymentResult {
        let server = self.store.server_id();
        let destination = format!("{}/{}", relative(&self.canonical_dir), file_name);
        match self.store.rename("/", file_name, &destination).await {
            Ok(()) => {
                info!(
                    server = %server,
                    file = %file_name,
                    to = %destination,
                    "moved from store root"
                );
                DeploymentResult::placed(file_name, PlacementLocation::Moved)
            }
            Err(e) => {
                warn!(
                    server = %server,
                    file = %file_name,
                    error = %e,
                    "move from store root failed"
                );
                DeploymentResult::ambiguous(
                    file_name,
                    format!(
                        "uploaded to the store root but moving into {} failed: {e}",
                        self.canonical_dir
                    ),
                )
            }
        }
    }
}

fn contains(entries: &[FileAttributes], file_name: &str) -> bool {
    entries.iter().any(|e| e.is_file && e.name == file_name)
}
