use super::state::StoreState;
use super::types::{ContainerKind, ContainerSpec, VersionRecord};
use super::{DocumentStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document store held entirely in memory.
///
/// Clones share the same underlying state, so a clone can be handed to
/// migration actions while the orchestrator keeps its own.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document into a collection, returning its assigned `_id`.
    pub async fn insert_document(
        &self,
        container: &str,
        document: Value,
    ) -> Result<u64, StoreError> {
        self.state.lock().await.insert_document(container, document)
    }

    pub async fn documents(&self, container: &str) -> Vec<Value> {
        self.state.lock().await.documents(container)
    }

    /// Drop a container. Returns false if it did not exist.
    pub async fn drop_container(&self, name: &str) -> bool {
        self.state.lock().await.drop_container(name)
    }

    /// Register a read-only view.
    pub async fn create_view(&self, name: &str) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .create_container(name, ContainerKind::View)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError> {
        Ok(self.state.lock().await.list_containers())
    }

    async fn create_container(&self, name: &str) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .create_container(name, ContainerKind::Collection)
    }

    async fn append_record(
        &self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        self.state.lock().await.append_record(container, record)
    }

    async fn most_recent_record(
        &self,
        container: &str,
    ) -> Result<Option<VersionRecord>, StoreError> {
        self.state.lock().await.most_recent_record(container)
    }

    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.state.lock().await.records(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_if_absent_is_idempotent() {
        let store = MemoryStore::new();
        assert!(!store.container_exists("migrations").await.unwrap());

        store.create_container_if_absent("migrations").await.unwrap();
        store.create_container_if_absent("migrations").await.unwrap();

        assert!(store.container_exists("migrations").await.unwrap());
        assert_eq!(store.list_containers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_view_does_not_count_as_collection() {
        let store = MemoryStore::new();
        store.create_view("migrations").await.unwrap();

        assert!(!store.container_exists("migrations").await.unwrap());
        // The name is taken, so bootstrapping surfaces the store's own error.
        let result = store.create_container_if_absent("migrations").await;
        assert!(matches!(result, Err(StoreError::ContainerExists(_))));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        handle
            .insert_document("users", json!({"name": "ada"}))
            .await
            .unwrap();

        assert_eq!(store.documents("users").await.len(), 1);
        assert!(store.drop_container("users").await);
        assert!(!handle.drop_container("users").await);
    }
}
