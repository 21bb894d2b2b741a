//! Versioned, reversible migrations for document databases.
//!
//! # Overview
//!
//! - Migrations are registered in a `MigrationRegistry`, which keeps them sorted
//!   by version and rejects duplicates
//! - `Migrate` resolves the current version from the history collection, selects
//!   the eligible migrations and runs them one step at a time
//! - Each step appends a `VersionRecord`; the newest record is the current version
//! - A failed step stops the batch without undoing earlier steps
//!
//! # Usage
//!
//! ```ignore
//! let registry = MigrationRegistry::from_migrations(vec![
//!     Migration::new(1, "create users")
//!         .with_up(|db: MemoryStore| async move {
//!             db.insert_document("users", json!({"name": "root"})).await?;
//!             anyhow::Ok(())
//!         })
//!         .with_down(|db: MemoryStore| async move {
//!             db.drop_container("users").await;
//!             anyhow::Ok(())
//!         }),
//! ])?;
//! let migrate = Migrate::new(store, registry);
//! migrate.up(ALL_AVAILABLE).await?;
//! ```

mod executor;
mod logger;
mod registry;
mod types;

pub use executor::Migrate;
pub use logger::{MigrationLogger, TracingLogger};
pub use registry::{MigrationRegistry, PlannedStep};
pub use types::{
    AppliedMigration, Migration, MigrationAction, MigrationDirection, MigrationError,
    MigrationReport, ALL_AVAILABLE,
};
