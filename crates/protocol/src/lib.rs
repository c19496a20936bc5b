//! Domain and wire types for the CraftDeploy mod pipeline.
//!
//! `types` holds the pipeline's own data model (queue entries, artifacts,
//! deployment results). `panel` mirrors the JSON shapes of the game panel's
//! client API that the pipeline actually reads or writes.

pub mod constants;
pub mod panel;
pub mod types;

pub use types::{
    Artifact, ArtifactSummary, DeployStatus, DeploymentResult, EntryStatus, Loader,
    PlacementLocation, QueueEntry, ServerConfig, ServerContext,
};
