//! Types for the migration system.

use crate::config::ConfigError;
use crate::store::StoreError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Pass as the step count to `up` or `down` to run every eligible migration.
/// Any non-positive count means the same.
pub const ALL_AVAILABLE: i64 = -1;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Migration {version} failed while migrating {direction}: {source}")]
    ActionFailed {
        version: u64,
        direction: MigrationDirection,
        #[source]
        source: anyhow::Error,
    },

    #[error("Duplicate migration version: {0}")]
    DuplicateVersion(u64),

    #[error("Invalid migration version: {0} (versions start at 1)")]
    InvalidVersion(u64),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Applying forward actions.
    Up,
    /// Applying backward actions.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Up => f.write_str("up"),
            MigrationDirection::Down => f.write_str("down"),
        }
    }
}

/// A forward or backward action run against the database handle `D`.
///
/// Implemented for any `Fn(D) -> impl Future<Output = anyhow::Result<()>>`, so
/// closures work directly:
///
/// ```ignore
/// Migration::new(1, "create users").with_up(|db: MemoryStore| async move {
///     db.insert_document("users", json!({"name": "root"})).await?;
///     anyhow::Ok(())
/// })
/// ```
#[async_trait]
pub trait MigrationAction<D>: Send + Sync {
    async fn run(&self, db: &D) -> anyhow::Result<()>;
}

#[async_trait]
impl<D, F, Fut> MigrationAction<D> for F
where
    D: Clone + Send + Sync + 'static,
    F: Fn(D) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, db: &D) -> anyhow::Result<()> {
        (self)(db.clone()).await
    }
}

/// A single versioned migration.
///
/// Either action may be absent; a migration without an action for a direction is
/// skipped in that direction but still takes part in version ordering.
pub struct Migration<D> {
    version: u64,
    description: String,
    up: Option<Arc<dyn MigrationAction<D>>>,
    down: Option<Arc<dyn MigrationAction<D>>>,
}

impl<D> Migration<D> {
    /// Create a migration with no actions.
    pub fn new(version: u64, description: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            up: None,
            down: None,
        }
    }

    pub fn with_up<A>(mut self, action: A) -> Self
    where
        A: MigrationAction<D> + 'static,
    {
        self.up = Some(Arc::new(action));
        self
    }

    pub fn with_down<A>(mut self, action: A) -> Self
    where
        A: MigrationAction<D> + 'static,
    {
        self.down = Some(Arc::new(action));
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_up(&self) -> bool {
        self.up.is_some()
    }

    pub fn has_down(&self) -> bool {
        self.down.is_some()
    }

    pub(crate) fn action(
        &self,
        direction: MigrationDirection,
    ) -> Option<&Arc<dyn MigrationAction<D>>> {
        match direction {
            MigrationDirection::Up => self.up.as_ref(),
            MigrationDirection::Down => self.down.as_ref(),
        }
    }
}

impl<D> Clone for Migration<D> {
    fn clone(&self) -> Self {
        Self {
            version: self.version,
            description: self.description.clone(),
            up: self.up.clone(),
            down: self.down.clone(),
        }
    }
}

impl<D> fmt::Debug for Migration<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("description", &self.description)
            .field("up", &self.has_up())
            .field("down", &self.has_down())
            .finish()
    }
}

/// A migration step that completed and was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: u64,
    pub description: String,
}

/// Result of a successful `up` or `down` batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub direction: MigrationDirection,
    /// Version before the batch started.
    pub from_version: u64,
    /// Version recorded by the last step, or `from_version` if nothing ran.
    pub to_version: u64,
    /// Steps in the order they ran.
    pub applied: Vec<AppliedMigration>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}
