//! Mod installation: queueing, loader detection and resolver orchestration.
//!
//! # Pipeline
//!
//! 1. **Queue**: operators enqueue package slugs per server ([`QueueStore`])
//! 2. **Detect**: derive loader and game version from the server environment
//! 3. **Resolve**: run the external resolver once per queued entry, sequentially
//! 4. **Collect**: read produced archives into memory, then drop the working directory
//!
//! Uploading the collected artifacts lives in `craftdeploy-deploy`.

pub mod detect;
pub mod error;
pub mod keyed;
pub mod orchestrator;
pub mod queue;
pub mod repository;
pub mod resolver;

pub use detect::{detect, detect_server_config};
pub use error::{InstallError, ResolverError};
pub use orchestrator::{InstallReport, InstallSettings, InstallationOrchestrator};
pub use queue::QueueStore;
pub use repository::{DeploymentRepository, DownloadCache, WorkerGuard};
pub use resolver::{ProcessOutput, ProcessRunner, ResolverFuture, ResolverRunner};
