use super::state::StoreState;
use super::types::{ContainerKind, ContainerSpec, VersionRecord};
use super::{DocumentStore, StoreError};
use crate::utils::write_atomic;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, Weak};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// One async mutex per store file, shared by every `JsonFileStore` in the process.
/// Entries are weak and pruned once no store operation holds them.
static FILE_LOCKS: Lazy<std::sync::Mutex<HashMap<PathBuf, Weak<Mutex<()>>>>> =
    Lazy::new(Default::default);

/// Resolve `path` to one spelling per file: the deepest existing ancestor of its
/// directory is canonicalized, so the file itself need not exist yet.
fn lock_key(path: &Path) -> PathBuf {
    let absolute = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    let (Some(parent), Some(file_name)) = (absolute.parent(), absolute.file_name()) else {
        return absolute;
    };

    for ancestor in parent.ancestors() {
        if let Ok(resolved) = std::fs::canonicalize(ancestor) {
            let rest = parent.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
            return resolved.join(rest).join(file_name);
        }
    }
    absolute
}

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(path);
    let mut locks = FILE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
        return lock;
    }

    locks.retain(|_, lock| lock.strong_count() > 0);
    let lock = Arc::new(Mutex::new(()));
    locks.insert(key, Arc::downgrade(&lock));
    lock
}

/// Document store persisted to a single JSON file.
///
/// Every operation reads the file, and mutations write it back atomically.
/// Read-modify-write cycles on the same file are serialized within one process,
/// however the path is spelled; separate processes sharing a file are not
/// coordinated.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<StoreState, StoreError> {
        if !self.path.exists() {
            return Ok(StoreState::default());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(StoreState::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreState) -> T + Send) -> Result<T, StoreError> {
        let lock = lock_for(&self.path);
        let _guard = lock.lock().await;
        let state = self.load().await?;
        Ok(f(&state))
    }

    async fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let lock = lock_for(&self.path);
        let _guard = lock.lock().await;

        let mut state = self.load().await?;
        let value = f(&mut state)?;

        let content = serde_json::to_string_pretty(&state)?;
        write_atomic(&self.path, &content).await?;
        debug!(path = %self.path.display(), "Store file written");
        Ok(value)
    }

    /// Insert a document into a collection, returning its assigned `_id`.
    pub async fn insert_document(
        &self,
        container: &str,
        document: Value,
    ) -> Result<u64, StoreError> {
        self.update(|state| state.insert_document(container, document))
            .await
    }

    pub async fn documents(&self, container: &str) -> Result<Vec<Value>, StoreError> {
        self.read(|state| state.documents(container)).await
    }

    /// Drop a container. Returns false if it did not exist.
    pub async fn drop_container(&self, name: &str) -> Result<bool, StoreError> {
        self.update(|state| Ok(state.drop_container(name))).await
    }

    /// Register a read-only view.
    pub async fn create_view(&self, name: &str) -> Result<(), StoreError> {
        self.update(|state| state.create_container(name, ContainerKind::View))
            .await
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError> {
        self.read(|state| state.list_containers()).await
    }

    async fn create_container(&self, name: &str) -> Result<(), StoreError> {
        self.update(|state| state.create_container(name, ContainerKind::Collection))
            .await
    }

    async fn append_record(
        &self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        self.update(|state| state.append_record(container, record))
            .await
    }

    async fn most_recent_record(
        &self,
        container: &str,
    ) -> Result<Option<VersionRecord>, StoreError> {
        self.read(|state| state.most_recent_record(container))
            .await?
    }

    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.read(|state| state.records(container)).await?
    }
}
