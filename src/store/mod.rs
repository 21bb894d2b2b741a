//! History store adapters.
//!
//! The orchestrator only needs four things from a document database: list its
//! containers, create one, append a version record, and fetch the most recently
//! appended record. [`DocumentStore`] captures exactly that, and each backend
//! implements it on top of its own client.
//!
//! - [`MemoryStore`]: in-process, cheap to clone, ideal for tests and embedding
//! - [`JsonFileStore`]: single JSON file with atomic writes
//! - `MongoStore` (feature `mongodb`): a live MongoDB database

mod file;
mod memory;
#[cfg(feature = "mongodb")]
mod mongo;
mod state;
mod types;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use types::{ContainerKind, ContainerSpec, VersionRecord};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Collection already exists: {0}")]
    ContainerExists(String),

    #[error("Collection {0} is read-only")]
    ReadOnlyContainer(String),

    #[error("Invalid record in {container}: {message}")]
    InvalidRecord { container: String, message: String },

    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    MongoError(#[from] mongodb::error::Error),
}

/// Operations the orchestrator performs against the document database.
///
/// None of these are transactional with the caller's own logic; every call
/// touches the live store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every container in the database. An empty database yields an empty list.
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError>;

    /// Issue the creation command for a collection. Fails if the name is taken.
    async fn create_container(&self, name: &str) -> Result<(), StoreError>;

    /// Insert one version record, creating the collection implicitly if needed.
    async fn append_record(&self, container: &str, record: &VersionRecord)
        -> Result<(), StoreError>;

    /// The record with the greatest insertion order, or `None` for an empty history.
    async fn most_recent_record(&self, container: &str)
        -> Result<Option<VersionRecord>, StoreError>;

    /// Every record of the history in insertion order.
    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError>;

    /// Whether a plain collection with this name exists. Views and other
    /// container kinds never match.
    async fn container_exists(&self, name: &str) -> Result<bool, StoreError> {
        let containers = self.list_containers().await?;
        Ok(containers
            .iter()
            .any(|c| c.kind.is_collection() && c.name == name))
    }

    /// Create the collection unless it already exists. Safe to call repeatedly.
    async fn create_container_if_absent(&self, name: &str) -> Result<(), StoreError> {
        if self.container_exists(name).await? {
            return Ok(());
        }

        debug!(collection = %name, "Creating history collection");
        self.create_container(name).await
    }
}
