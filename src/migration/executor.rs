//! Migration executor for running migrations.

use super::logger::MigrationLogger;
use super::registry::MigrationRegistry;
use super::types::{AppliedMigration, MigrationDirection, MigrationError, MigrationReport};
use crate::config::{MigrateConfig, DEFAULT_MIGRATIONS_COLLECTION};
use crate::store::{DocumentStore, VersionRecord};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Executor for running migrations against a document store.
///
/// The database is versioned through a dedicated collection. Every applied step,
/// up or down, appends one record holding the resulting version, its description
/// and a UTC timestamp. The current version is the one in the most recently
/// appended record.
///
/// The store handle doubles as the database handle passed to migration actions.
/// Steps are not rolled back on failure: the history always reflects the last
/// step that fully completed.
pub struct Migrate<S> {
    store: S,
    registry: MigrationRegistry<S>,
    migrations_collection: String,
    logger: Option<Arc<dyn MigrationLogger>>,
    operation_timeout: Option<Duration>,
}

impl<S: DocumentStore> Migrate<S> {
    /// Create a new executor over `store` with the given registry.
    pub fn new(store: S, registry: MigrationRegistry<S>) -> Self {
        Self {
            store,
            registry,
            migrations_collection: DEFAULT_MIGRATIONS_COLLECTION.to_string(),
            logger: None,
            operation_timeout: None,
        }
    }

    /// Apply collection name and timeout from a configuration, after validating it.
    pub fn with_config(mut self, config: &MigrateConfig) -> Result<Self, MigrationError> {
        config.validate()?;
        self.migrations_collection = config.migrations_collection.clone();
        self.operation_timeout = config.operation_timeout();
        Ok(self)
    }

    /// Replace the name of the collection storing version records.
    pub fn set_migrations_collection(&mut self, name: impl Into<String>) {
        self.migrations_collection = name.into();
    }

    pub fn migrations_collection(&self) -> &str {
        &self.migrations_collection
    }

    /// Report each completed step to `logger`.
    pub fn set_logger(&mut self, logger: impl MigrationLogger + 'static) {
        self.logger = Some(Arc::new(logger));
    }

    pub fn clear_logger(&mut self) {
        self.logger = None;
    }

    /// Bound every store call and every migration action by `timeout`.
    pub fn set_operation_timeout(&mut self, timeout: Option<Duration>) {
        self.operation_timeout = timeout;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &MigrationRegistry<S> {
        &self.registry
    }

    /// Current database version and its description.
    ///
    /// Creates the history collection on first use. An empty history is
    /// version 0 with an empty description.
    pub async fn version(&self) -> Result<(u64, String), MigrationError> {
        let collection = self.migrations_collection.as_str();
        self.bounded(self.store.create_container_if_absent(collection))
            .await?;

        let latest = self
            .bounded(self.store.most_recent_record(collection))
            .await?;

        Ok(latest
            .map(|record| (record.version, record.description))
            .unwrap_or_default())
    }

    /// Forcibly stamp the database with `version`, without running any migration.
    pub async fn set_version(&self, version: u64, description: &str) -> Result<(), MigrationError> {
        let record = VersionRecord::new(version, description);
        self.bounded(
            self.store
                .append_record(&self.migrations_collection, &record),
        )
        .await?;

        debug!(version, description = %description, "Version recorded");
        Ok(())
    }

    /// Every version record in the order it was appended.
    pub async fn history(&self) -> Result<Vec<VersionRecord>, MigrationError> {
        self.bounded(self.store.records(&self.migrations_collection))
            .await
    }

    /// Run up to `n` forward migrations newer than the current version.
    ///
    /// A non-positive `n` (such as [`ALL_AVAILABLE`](super::ALL_AVAILABLE)) runs
    /// every one of them.
    pub async fn up(&self, n: i64) -> Result<MigrationReport, MigrationError> {
        self.run(MigrationDirection::Up, n).await
    }

    /// Undo up to `n` migrations at or below the current version, newest first.
    ///
    /// A non-positive `n` undoes every one of them.
    pub async fn down(&self, n: i64) -> Result<MigrationReport, MigrationError> {
        self.run(MigrationDirection::Down, n).await
    }

    async fn run(
        &self,
        direction: MigrationDirection,
        n: i64,
    ) -> Result<MigrationReport, MigrationError> {
        let (current, _) = self.version().await?;
        let steps = self.registry.plan(direction, current, n);

        info!(
            direction = %direction,
            from = current,
            pending = steps.len(),
            "Starting migration"
        );

        let mut report = MigrationReport {
            direction,
            from_version: current,
            to_version: current,
            applied: Vec::new(),
        };

        for step in steps {
            let migration = step.migration;
            let action = step.action;

            debug!(
                version = migration.version(),
                description = %migration.description(),
                "Applying migration"
            );

            let applied = self
                .bounded(async {
                    action
                        .run(&self.store)
                        .await
                        .map_err(|source| MigrationError::ActionFailed {
                            version: migration.version(),
                            direction,
                            source,
                        })
                })
                .await;
            if let Err(e) = applied {
                error!(version = migration.version(), error = %e, "Migration failed");
                return Err(e);
            }

            if let Err(e) = self
                .set_version(step.record_version, step.record_description)
                .await
            {
                error!(
                    version = migration.version(),
                    error = %e,
                    "Migration applied but its version could not be recorded"
                );
                return Err(e);
            }

            match direction {
                MigrationDirection::Up => {
                    self.print_up(migration.version(), migration.description())
                }
                MigrationDirection::Down => {
                    self.print_down(migration.version(), migration.description())
                }
            }

            report.to_version = step.record_version;
            report.applied.push(AppliedMigration {
                version: migration.version(),
                description: migration.description().to_string(),
            });
        }

        info!(
            direction = %direction,
            from = report.from_version,
            to = report.to_version,
            count = report.applied.len(),
            "Migration completed"
        );

        Ok(report)
    }

    async fn bounded<T, E, F>(&self, operation: F) -> Result<T, MigrationError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<MigrationError>,
    {
        let result = match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| MigrationError::Timeout(limit))?,
            None => operation.await,
        };
        result.map_err(Into::into)
    }

    fn print_up(&self, version: u64, description: &str) {
        self.printf(format_args!("Migrated UP: {} {}", version, description));
    }

    fn print_down(&self, version: u64, description: &str) {
        self.printf(format_args!("Migrated DOWN: {} {}", version, description));
    }

    fn printf(&self, args: fmt::Arguments<'_>) {
        if let Some(logger) = &self.logger {
            logger.log(args);
        }
    }
}
