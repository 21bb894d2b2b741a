#![allow(dead_code)]

use async_trait::async_trait;
use docmigrate::{
    ContainerSpec, DocumentStore, MemoryStore, Migration, MigrationLogger, StoreError,
    VersionRecord,
};
use serde_json::json;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// How long a stalled store call hangs; far beyond any timeout used in tests.
pub const STALL: Duration = Duration::from_secs(30);

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Shared log of action invocations, e.g. `["up:1", "up:2", "down:2"]`.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Migration whose actions record themselves and create/drop a marker collection.
pub fn tracked(version: u64, description: &str, calls: &Calls) -> Migration<MemoryStore> {
    let up_calls = calls.clone();
    let down_calls = calls.clone();
    let marker = format!("marker_{version}");
    let down_marker = marker.clone();

    Migration::new(version, description)
        .with_up(move |db: MemoryStore| {
            let calls = up_calls.clone();
            let marker = marker.clone();
            async move {
                db.insert_document(&marker, json!({ "version": version }))
                    .await?;
                calls.push(format!("up:{version}"));
                anyhow::Ok(())
            }
        })
        .with_down(move |db: MemoryStore| {
            let calls = down_calls.clone();
            let marker = down_marker.clone();
            async move {
                db.drop_container(&marker).await;
                calls.push(format!("down:{version}"));
                anyhow::Ok(())
            }
        })
}

/// Migration over any handle whose forward action only records itself.
pub fn counted<S>(version: u64, calls: &Calls) -> Migration<S>
where
    S: Clone + Send + Sync + 'static,
{
    let calls = calls.clone();
    Migration::new(version, format!("step {version}")).with_up(move |_db: S| {
        let calls = calls.clone();
        async move {
            calls.push(format!("up:{version}"));
            anyhow::Ok(())
        }
    })
}

/// Migration with only a forward action that always fails.
pub fn failing_up(version: u64, calls: &Calls) -> Migration<MemoryStore> {
    let calls = calls.clone();
    Migration::new(version, "fails").with_up(move |_db: MemoryStore| {
        let calls = calls.clone();
        async move {
            calls.push(format!("up:{version}"));
            Err::<(), _>(anyhow::anyhow!("injected failure in {version}"))
        }
    })
}

/// Logger that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl MigrationLogger for RecordingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        self.messages.lock().unwrap().push(args.to_string());
    }
}

/// Memory store whose record appends start failing after a budget is spent.
#[derive(Debug, Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    appends_left: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn failing_after(appends: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            appends_left: Arc::new(AtomicUsize::new(appends)),
        }
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError> {
        self.inner.list_containers().await
    }

    async fn create_container(&self, name: &str) -> Result<(), StoreError> {
        self.inner.create_container(name).await
    }

    async fn append_record(
        &self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        let spent = self
            .appends_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if spent.is_err() {
            return Err(StoreError::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection reset",
            )));
        }
        self.inner.append_record(container, record).await
    }

    async fn most_recent_record(
        &self,
        container: &str,
    ) -> Result<Option<VersionRecord>, StoreError> {
        self.inner.most_recent_record(container).await
    }

    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.inner.records(container).await
    }
}

/// Memory store whose calls hang once told to, to exercise operation timeouts.
#[derive(Debug, Clone)]
pub struct StallingStore {
    pub inner: MemoryStore,
    appends_left: Arc<AtomicUsize>,
    stall_reads: Arc<AtomicBool>,
}

impl StallingStore {
    /// Appends succeed `appends` times, then hang.
    pub fn stalling_appends_after(appends: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            appends_left: Arc::new(AtomicUsize::new(appends)),
            stall_reads: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every later `most_recent_record` call hang.
    pub fn stall_reads(&self) {
        self.stall_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for StallingStore {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError> {
        self.inner.list_containers().await
    }

    async fn create_container(&self, name: &str) -> Result<(), StoreError> {
        self.inner.create_container(name).await
    }

    async fn append_record(
        &self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        let spent = self
            .appends_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if spent.is_err() {
            tokio::time::sleep(STALL).await;
        }
        self.inner.append_record(container, record).await
    }

    async fn most_recent_record(
        &self,
        container: &str,
    ) -> Result<Option<VersionRecord>, StoreError> {
        if self.stall_reads.load(Ordering::SeqCst) {
            tokio::time::sleep(STALL).await;
        }
        self.inner.most_recent_record(container).await
    }

    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.inner.records(container).await
    }
}
