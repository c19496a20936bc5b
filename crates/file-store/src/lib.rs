//! Remote file store access for game servers.
//!
//! [`FileStore`] is the seam the deploy pipeline talks to. [`PanelClient`]
//! implements it on top of the game panel's client API; tests implement it
//! with in-memory mocks.

pub mod client;
pub mod error;
pub mod store;

pub use client::{PanelClient, PanelFiles};
pub use error::FileStoreError;
pub use store::{FileStore, StoreFuture};
