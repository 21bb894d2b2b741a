//! Ordered, reversible migrations for document databases, tracked in an
//! append-only version history.

pub mod config;
pub mod migration;
pub mod store;
mod utils;

// Re-export commonly used types
pub use config::{
    read_config, write_config, ConfigError, MigrateConfig, DEFAULT_MIGRATIONS_COLLECTION,
};
pub use migration::{
    AppliedMigration, Migrate, Migration, MigrationAction, MigrationDirection, MigrationError,
    MigrationLogger, MigrationRegistry, MigrationReport, PlannedStep, TracingLogger, ALL_AVAILABLE,
};
#[cfg(feature = "mongodb")]
pub use store::MongoStore;
pub use store::{
    ContainerKind, ContainerSpec, DocumentStore, JsonFileStore, MemoryStore, StoreError,
    VersionRecord,
};
