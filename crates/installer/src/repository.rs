//! In-memory state owned by the service for its whole lifetime.
//!
//! Nothing here survives a restart: queues and cached artifacts are
//! ephemeral, and an operator simply re-queues after a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use craftdeploy_protocol::{Artifact, ArtifactSummary};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::keyed::Keyed;
use crate::queue::QueueStore;

/// Artifacts produced by install runs per server, kept until they are placed.
#[derive(Debug, Default)]
pub struct DownloadCache {
    entries: Keyed<Vec<Artifact>>,
}

impl DownloadCache {
    /// Stores the artifacts of an install run, replacing any earlier set.
    pub fn store(&self, server_id: &str, artifacts: Vec<Artifact>) {
        debug!(server = %server_id, count = artifacts.len(), "caching artifacts");
        if artifacts.is_empty() {
            self.entries.remove(server_id);
            return;
        }
        self.entries.with(server_id, |slot| *slot = artifacts);
    }

    /// Copy of the cached artifacts, `None` when nothing is cached.
    pub fn get(&self, server_id: &str) -> Option<Vec<Artifact>> {
        self.entries
            .with_existing(server_id, |slot| slot.clone())
            .filter(|artifacts| !artifacts.is_empty())
    }

    /// Keeps only the artifacts for which `keep` holds and returns how many
    /// remain. The entry is dropped once nothing remains.
    pub fn retain(&self, server_id: &str, keep: impl Fn(&Artifact) -> bool) -> usize {
        let remaining = self
            .entries
            .with_existing(server_id, |slot| {
                slot.retain(|a| keep(a));
                slot.len()
            })
            .unwrap_or(0);
        if remaining == 0 {
            self.entries.remove_if(server_id, Vec::is_empty);
        }
        remaining
    }

    /// Lists what is cached without consuming it.
    pub fn summaries(&self, server_id: &str) -> Vec<ArtifactSummary> {
        self.entries
            .with_existing(server_id, |slot| slot.iter().map(Artifact::summary).collect())
            .unwrap_or_default()
    }

    pub fn discard(&self, server_id: &str) {
        self.entries.remove(server_id);
    }
}

/// Exclusive right to run install or upload work for one server.
///
/// The lock entry is dropped with the last guard, so ids that are never
/// used again leave nothing behind.
pub struct WorkerGuard<'a> {
    workers: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    server_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = workers
            .get(&self.server_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            workers.remove(&self.server_id);
        }
    }
}

/// Owns the queue store, the download cache and the per-server worker locks.
#[derive(Debug, Default)]
pub struct DeploymentRepository {
    queues: QueueStore,
    downloads: DownloadCache,
    workers: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeploymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queues(&self) -> &QueueStore {
        &self.queues
    }

    pub fn downloads(&self) -> &DownloadCache {
        &self.downloads
    }

    pub fn store_artifacts(&self, server_id: &str, artifacts: Vec<Artifact>) {
        self.downloads.store(server_id, artifacts);
    }

    pub fn cached_artifacts(&self, server_id: &str) -> Option<Vec<Artifact>> {
        self.downloads.get(server_id)
    }

    /// Drops both the queue and any cached artifacts for a server.
    pub fn reset(&self, server_id: &str) {
        self.queues.clear(server_id);
        self.downloads.discard(server_id);
    }

    /// Waits for the lock that serializes install and upload work for one
    /// server. Other servers use other locks.
    pub async fn lock_worker(&self, server_id: &str) -> WorkerGuard<'_> {
        let lock = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(workers.entry(server_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        WorkerGuard {
            workers: &self.workers,
            server_id: server_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_workers(&self) -> usize {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
