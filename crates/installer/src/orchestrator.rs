//! Drives one installation run for a server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use craftdeploy_protocol::constants::{ARTIFACT_EXTENSION, RESOLVER_TIMEOUT, WORK_DIR_PREFIX};
use craftdeploy_protocol::{Artifact, EntryStatus, QueueEntry, ServerConfig, ServerContext};
use tracing::{debug, info, warn};

use crate::detect::detect_server_config;
use crate::error::InstallError;
use crate::queue::QueueStore;
use crate::resolver::ResolverRunner;

/// Error recorded on an entry whose install run was dropped.
pub const CANCELLED: &str = "install cancelled before the resolver finished";

/// Knobs for the resolver invocations.
#[derive(Debug, Clone)]
pub struct InstallSettings {
    pub timeout: Duration,
    /// Package-catalog key forwarded to the resolver as `--api-key`.
    pub api_key: Option<String>,
    /// Parent of the transient working directories; the system temp dir if unset.
    pub work_root: Option<PathBuf>,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            timeout: RESOLVER_TIMEOUT,
            api_key: None,
            work_root: None,
        }
    }
}

/// Outcome of an installation run.
///
/// `success_count` is what the resolver reported; `artifacts` is what was
/// actually found on disk. Only the latter gets deployed.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub config: ServerConfig,
    pub entries: Vec<QueueEntry>,
    pub artifacts: Vec<Artifact>,
    pub success_count: usize,
    pub fail_count: usize,
    /// Set when the resolver reported successes but produced no archives.
    pub artifacts_missing: bool,
    /// Entries that were still `queued` when the run started.
    pub processed: usize,
}

#[derive(Debug, Default)]
struct Tally {
    success: usize,
    fail: usize,
}

pub struct InstallationOrchestrator {
    runner: Arc<dyn ResolverRunner>,
    settings: InstallSettings,
}

impl InstallationOrchestrator {
    pub fn new(runner: Arc<dyn ResolverRunner>, settings: InstallSettings) -> Self {
        Self { runner, settings }
    }

    /// Resolves every queued entry of `server_id` and collects the archives.
    ///
    /// Entries are processed one at a time. A failing entry is recorded on the
    /// queue and does not stop the rest. The working directory is removed
    /// before this returns, whatever the outcome.
    pub async fn install(
        &self,
        queues: &QueueStore,
        server_id: &str,
        ctx: &ServerContext,
    ) -> Result<InstallReport, InstallError> {
        let queued = queues.list(server_id);
        if queued.is_empty() {
            return Err(InstallError::NoQueue {
                server: server_id.to_string(),
            });
        }

        let config = detect_server_config(ctx);
        let processed = queued
            .iter()
            .filter(|e| e.status == EntryStatus::Queued)
            .count();
        if processed == 0 {
            info!(server = %server_id, entries = queued.len(), "no queued entries to install");
            return Ok(InstallReport {
                config,
                entries: queued,
                artifacts: Vec::new(),
                success_count: 0,
                fail_count: 0,
                artifacts_missing: false,
                processed,
            });
        }
        info!(
            server = %server_id,
            loader = %config.loader,
            game_version = %config.game_version,
            entries = processed,
            "starting installation"
        );

        let workdir = self.create_workdir()?;
        let outcome = self
            .resolve_all(queues, server_id, &config, &queued, workdir.path())
            .await;

        let path = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            warn!(
                server = %server_id,
                path = %path.display(),
                error = %e,
                "failed to remove working directory"
            );
        }
        let (tally, artifacts) = outcome?;

        let artifacts_missing = tally.success > 0 && artifacts.is_empty();
        if artifacts_missing {
            warn!(
                server = %server_id,
                success = tally.success,
                "resolver reported success but produced no archives"
            );
        }

        info!(
            server = %server_id,
            success = tally.success,
            failed = tally.fail,
            artifacts = artifacts.len(),
            "installation finished"
        );

        Ok(InstallReport {
            config,
            entries: queues.list(server_id),
            artifacts,
            success_count: tally.success,
            fail_count: tally.fail,
            artifacts_missing,
            processed,
        })
    }

    fn create_workdir(&self) -> Result<tempfile::TempDir, InstallError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_DIR_PREFIX);
        let dir = match &self.settings.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(InstallError::WorkDir)
    }

    async fn resolve_all(
        &self,
        queues: &QueueStore,
        server_id: &str,
        config: &ServerConfig,
        entries: &[QueueEntry],
        workdir: &Path,
    ) -> Result<(Tally, Vec<Artifact>), InstallError> {
        let mut tally = Tally::default();

        for entry in entries.iter().filter(|e| e.status == EntryStatus::Queued) {
            let slug = entry.slug.as_str();
            queues.set_status(server_id, slug, EntryStatus::Installing, None);
            let mut in_flight = InFlight {
                queues,
                server_id,
                slug,
                settled: false,
            };

            let args = self.resolver_args(slug, config, workdir);
            let result = self.runner.run(&args, self.settings.timeout).await;
            in_flight.settled = true;

            let failure = match result {
                Ok(output) if output.success() => None,
                Ok(output) => Some(output.failure_message()),
                Err(e) => Some(e.to_string()),
            };

            match failure {
                None => {
                    debug!(server = %server_id, slug = %slug, "resolved");
                    queues.set_status(server_id, slug, EntryStatus::Installed, None);
                    tally.success += 1;
                }
                Some(message) => {
                    warn!(server = %server_id, slug = %slug, error = %message, "resolver failed");
                    queues.set_status(server_id, slug, EntryStatus::Error, Some(message));
                    tally.fail += 1;
                }
            }
        }

        let artifacts = collect_artifacts(workdir).await?;
        Ok((tally, artifacts))
    }

    fn resolver_args(&self, slug: &str, config: &ServerConfig, workdir: &Path) -> Vec<String> {
        let mut args = vec![
            slug.to_string(),
            "--loader".to_string(),
            config.loader.as_str().to_string(),
            "--game-version".to_string(),
            config.game_version.clone(),
            "--download-dir".to_string(),
            workdir.display().to_string(),
        ];
        if let Some(key) = &self.settings.api_key {
            args.push("--api-key".to_string());
            args.push(key.clone());
        }
        args
    }
}

/// Fails the entry being resolved if the run is dropped before it settles.
struct InFlight<'a> {
    queues: &'a QueueStore,
    server_id: &'a str,
    slug: &'a str,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!(server = %self.server_id, slug = %self.slug, "install cancelled mid-resolve");
        self.queues.set_status(
            self.server_id,
            self.slug,
            EntryStatus::Error,
            Some(CANCELLED.to_string()),
        );
    }
}

/// Reads every archive directly inside `dir`, sorted by file name.
async fn collect_artifacts(dir: &Path) -> std::io::Result<Vec<Artifact>> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION));
        if is_archive {
            found.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));

    let mut artifacts = Vec::with_capacity(found.len());
    for (name, path) in found {
        let bytes = tokio::fs::read(&path).await?;
        artifacts.push(Artifact::new(name, bytes));
    }
    Ok(artifacts)
}
