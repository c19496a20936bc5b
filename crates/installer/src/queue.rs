//! Per-server install queue.

use std::sync::PoisonError;

use chrono::Utc;
use craftdeploy_protocol::{EntryStatus, QueueEntry};
use tracing::{debug, warn};

use crate::keyed::Keyed;

/// Ordered, slug-unique queue of package entries per server.
///
/// Every operation runs under the server's own lock, so concurrent calls for
/// one server are serialized and calls for different servers never block
/// each other. Callers get snapshots, never references into the store.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: Keyed<Vec<QueueEntry>>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a `queued` entry unless `slug` is already queued.
    pub fn enqueue(&self, server_id: &str, slug: &str, title: &str) -> Vec<QueueEntry> {
        self.queues.with(server_id, |queue| {
            if queue.iter().any(|e| e.slug == slug) {
                debug!(server = %server_id, slug = %slug, "already queued");
            } else {
                queue.push(QueueEntry::new(slug, title));
                debug!(server = %server_id, slug = %slug, len = queue.len(), "queued");
            }
            queue.clone()
        })
    }

    /// Removes the entry for `slug`, if any. An emptied queue is dropped.
    pub fn dequeue(&self, server_id: &str, slug: &str) -> Vec<QueueEntry> {
        let remaining = self
            .queues
            .with_existing(server_id, |queue| {
                queue.retain(|e| e.slug != slug);
                queue.clone()
            })
            .unwrap_or_default();
        if remaining.is_empty() {
            self.queues.remove_if(server_id, Vec::is_empty);
        }
        remaining
    }

    pub fn list(&self, server_id: &str) -> Vec<QueueEntry> {
        match self.queues.get(server_id) {
            Some(slot) => slot.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }

    /// Number of entries still waiting for an install run.
    pub fn pending(&self, server_id: &str) -> usize {
        self.list(server_id)
            .iter()
            .filter(|e| e.status == EntryStatus::Queued)
            .count()
    }

    pub fn clear(&self, server_id: &str) {
        self.queues.remove(server_id);
    }

    /// Moves an entry forward in its lifecycle.
    ///
    /// Returns `false` when the entry is missing or the transition would move
    /// backward. `error` is recorded only on a move to [`EntryStatus::Error`].
    pub fn set_status(
        &self,
        server_id: &str,
        slug: &str,
        status: EntryStatus,
        error: Option<String>,
    ) -> bool {
        self.queues
            .with_existing(server_id, |queue| {
                let Some(entry) = queue.iter_mut().find(|e| e.slug == slug) else {
                    return false;
                };
                if !entry.status.can_transition_to(status) {
                    warn!(
                        server = %server_id,
                        slug = %slug,
                        from = ?entry.status,
                        to = ?status,
                        "rejected status transition"
                    );
                    return false;
                }
                entry.status = status;
                match status {
                    EntryStatus::Installed => entry.installed_at = Some(Utc::now()),
                    EntryStatus::Error => entry.error = error,
                    _ => {}
                }
                true
            })
            .unwrap_or(false)
    }
}
