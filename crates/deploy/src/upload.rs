//! The upload phase for one server.

use craftdeploy_file_store::FileStore;
use craftdeploy_protocol::{Artifact, DeploymentResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::duplicates::resolve_duplicates;
use crate::error::DeployError;
use crate::placement::{PlacementProtocol, list_hinted};

/// Outcome of an upload phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub results: Vec<DeploymentResult>,
    /// Superseded remote archives that were removed.
    pub deleted: Vec<String>,
    pub delete_failures: Vec<String>,
}

impl UploadReport {
    /// True when every archive was verified in place.
    pub fn all_placed(&self) -> bool {
        self.results.iter().all(DeploymentResult::is_success)
    }
}

/// Deletes superseded archives, then places each new one in turn.
pub struct UploadPhase<'a> {
    store: &'a dyn FileStore,
    placement: PlacementProtocol<'a>,
}

impl<'a> UploadPhase<'a> {
    pub fn new(store: &'a dyn FileStore, canonical_dir: &str) -> Self {
        Self {
            store,
            placement: PlacementProtocol::new(store, canonical_dir),
        }
    }

    /// Runs the phase.
    ///
    /// Only an unreachable store aborts with an error; anything that goes
    /// wrong for a single file is reported in the [`UploadReport`].
    pub async fn run(&self, artifacts: &[Artifact]) -> Result<UploadReport, DeployError> {
        let server = self.store.server_id();
        let canonical = self.placement.canonical_dir();
        info!(server = %server, dir = %canonical, artifacts = artifacts.len(), "starting upload");

        let existing = match self.placement.list_canonical().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    server = %server,
                    dir = %canonical,
                    error = %e,
                    "canonical directory not listable"
                );
                self.ensure_folder().await?;
                Vec::new()
            }
        };

        let existing: Vec<&str> = existing
            .iter()
            .filter(|e| e.is_file)
            .map(|e| e.name.as_str())
            .collect();
        let incoming: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();

        let mut report = UploadReport::default();
        for name in resolve_duplicates(&incoming[..], &existing[..]) {
            match self.store.delete(canonical, std::slice::from_ref(&name)).await {
                Ok(()) => {
                    info!(server = %server, file = %name, "deleted superseded archive");
                    report.deleted.push(name);
                }
                Err(e) => {
                    warn!(
                        server = %server,
                        file = %name,
                        error = %e,
                        "failed to delete superseded archive"
                    );
                    report.delete_failures.push(name);
                }
            }
        }

        for artifact in artifacts {
            let result = self.placement.place(&artifact.bytes, &artifact.name).await;
            report.results.push(result);
        }

        let placed = report.results.iter().filter(|r| r.is_success()).count();
        info!(
            server = %server,
            placed,
            failed = report.results.len() - placed,
            deleted = report.deleted.len(),
            "upload finished"
        );
        Ok(report)
    }

    /// Creates the canonical folder when its parent lacks it.
    ///
    /// The root is always listed first; a store that cannot list its root is
    /// treated as unreachable.
    async fn ensure_folder(&self) -> Result<(), DeployError> {
        let server = self.store.server_id();
        let canonical = self.placement.canonical_dir();
        let (parent, name) = match canonical.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((parent, name)) => (parent, name),
            None => ("/", canonical),
        };

        let root = self.store.list_directory(None).await?;
        let siblings = if parent == "/" {
            root
        } else {
            list_hinted(self.store, parent).await.unwrap_or_else(|e| {
                debug!(
                    server = %server,
                    path = %parent,
                    error = %e,
                    "parent directory not listable"
                );
                Vec::new()
            })
        };
        if siblings.iter().any(|e| !e.is_file && e.name == name) {
            return Ok(());
        }

        info!(server = %server, name = %name, path = %parent, "creating canonical directory");
        if let Err(e) = self.store.create_folder(name, parent).await {
            warn!(
                server = %server,
                dir = %canonical,
                error = %e,
                "failed to create canonical directory"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use craftdeploy_protocol::PlacementLocation;

    use super::*;
    use crate::mock::{MockStore, ROOT, file, folder};

    fn jar(name: &str) -> Artifact {
        Artifact::new(name, name.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn replaces_old_versions() {
        let store = MockStore::cooperative();
        store.seed(
            "/mods",
            vec![file("sodium-fabric-mc1.20.1-0.5.4.jar"), file("lithium-0.11.jar")],
        );
        let phase = UploadPhase::new(&store, "/mods");

        let report = phase
            .run(&[jar("sodium-fabric-mc1.20.1-0.6.0.jar")])
            .await
            .unwrap();

        assert_eq!(report.deleted, vec!["sodium-fabric-mc1.20.1-0.5.4.jar"]);
        assert!(report.all_placed());
        let mut names = store.names_in("/mods");
        names.sort();
        assert_eq!(names, vec!["lithium-0.11.jar", "sodium-fabric-mc1.20.1-0.6.0.jar"]);
    }

    #[tokio::test]
    async fn delete_failures_do_not_stop_others() {
        let mut store = MockStore::cooperative();
        store.fail_delete.insert("a-1.0.jar".to_string());
        store.seed("/mods", vec![file("a-1.0.jar"), file("b-1.0.jar")]);
        let phase = UploadPhase::new(&store, "/mods");

        let report = phase.run(&[jar("a-2.0.jar"), jar("b-2.0.jar")]).await.unwrap();

        assert_eq!(report.delete_failures, vec!["a-1.0.jar"]);
        assert_eq!(report.deleted, vec!["b-1.0.jar"]);
        assert_eq!(report.results.len(), 2);
        let deletes: Vec<_> = store
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("delete"))
            .collect();
        assert_eq!(deletes, vec!["delete /mods a-1.0.jar", "delete /mods b-1.0.jar"]);
    }

    #[tokio::test]
    async fn places_sequentially_in_order() {
        let store = MockStore::cooperative();
        let phase = UploadPhase::new(&store, "/mods");

        let report = phase.run(&[jar("a.jar"), jar("b.jar"), jar("c.jar")]).await.unwrap();
        let files: Vec<_> = report.results.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["a.jar", "b.jar", "c.jar"]);

        let uploads: Vec<_> = store
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("upload"))
            .collect();
        assert_eq!(uploads, vec!["upload a.jar", "upload b.jar", "upload c.jar"]);
    }

    #[tokio::test]
    async fn creates_missing_folder() {
        let store = MockStore::hostile();
        store.seed(ROOT, vec![folder("config")]);
        let phase = UploadPhase::new(&store, "/mods");

        let report = phase.run(&[jar("sodium.jar")]).await.unwrap();

        assert!(store.calls().contains(&"mkdir mods in /".to_string()));
        assert_eq!(report.results[0].location, Some(PlacementLocation::Moved));
        assert_eq!(store.names_in("/mods"), vec!["sodium.jar"]);
    }

    #[tokio::test]
    async fn existing_folder_is_not_recreated() {
        let store = MockStore::hostile();
        store.seed(ROOT, vec![folder("mods")]);
        store.seed("/mods", Vec::new());
        let phase = UploadPhase::new(&store, "/mods");

        phase.run(&[jar("sodium.jar")]).await.unwrap();
        assert!(!store.calls().iter().any(|c| c.starts_with("mkdir")));
    }

    #[tokio::test]
    async fn nested_folder_found_in_parent() {
        let mut store = MockStore::hostile();
        store.listable_paths.insert("/config".to_string());
        store.seed(ROOT, vec![folder("config")]);
        store.seed("/config", vec![folder("mods")]);
        let phase = UploadPhase::new(&store, "/config/mods");

        phase.run(&[jar("sodium.jar")]).await.unwrap();
        let calls = store.calls();
        assert!(calls.contains(&"list /config".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("mkdir")));
    }

    #[tokio::test]
    async fn nested_folder_created_under_parent() {
        let mut store = MockStore::hostile();
        store.listable_paths.insert("/config".to_string());
        store.seed(ROOT, vec![folder("config")]);
        store.seed("/config", vec![file("server.properties")]);
        let phase = UploadPhase::new(&store, "/config/mods");

        phase.run(&[jar("sodium.jar")]).await.unwrap();
        assert!(store.calls().contains(&"mkdir mods in /config".to_string()));
    }

    #[tokio::test]
    async fn unreachable_store_aborts() {
        let mut store = MockStore::hostile();
        store.fail_root_list = true;
        let phase = UploadPhase::new(&store, "/mods");

        let err = phase.run(&[jar("sodium.jar")]).await.unwrap_err();
        assert!(matches!(err, DeployError::FileStore(_)));
        assert!(!store.calls().iter().any(|c| c.starts_with("upload")));
    }

    #[tokio::test]
    async fn partial_placement_is_reported() {
        let mut store = MockStore::cooperative();
        store.lose_uploads = true;
        let phase = UploadPhase::new(&store, "/mods");

        let report = phase.run(&[jar("ghost.jar")]).await.unwrap();
        assert!(!report.all_placed());
        assert_eq!(report.results[0].location, Some(PlacementLocation::Ambiguous));
    }
}
