//! Migration registry and step selection.

use super::types::{Migration, MigrationAction, MigrationDirection, MigrationError};
use std::sync::Arc;

/// One step chosen for a batch, together with the record it leaves behind.
pub struct PlannedStep<'a, D> {
    pub migration: &'a Migration<D>,
    /// The migration's action for the planned direction.
    pub action: &'a Arc<dyn MigrationAction<D>>,
    /// Version written to the history once the step succeeds.
    pub record_version: u64,
    /// Description written alongside `record_version`.
    pub record_description: &'a str,
}

impl<D> std::fmt::Debug for PlannedStep<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannedStep")
            .field("migration", &self.migration)
            .field("record_version", &self.record_version)
            .field("record_description", &self.record_description)
            .finish()
    }
}

/// Registry of all available migrations.
///
/// Migrations are kept sorted by version. Versions must be unique and
/// non-zero, since version 0 denotes a database with no history.
pub struct MigrationRegistry<D> {
    migrations: Vec<Migration<D>>,
}

impl<D> MigrationRegistry<D> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Build a registry from migrations given in any order.
    pub fn from_migrations(
        migrations: impl IntoIterator<Item = Migration<D>>,
    ) -> Result<Self, MigrationError> {
        let mut registry = Self::new();
        for migration in migrations {
            registry.register(migration)?;
        }
        Ok(registry)
    }

    /// Register a migration, keeping the registry sorted by version.
    pub fn register(&mut self, migration: Migration<D>) -> Result<(), MigrationError> {
        let version = migration.version();
        if version == 0 {
            return Err(MigrationError::InvalidVersion(version));
        }

        match self
            .migrations
            .binary_search_by_key(&version, |m| m.version())
        {
            Ok(_) => Err(MigrationError::DuplicateVersion(version)),
            Err(index) => {
                self.migrations.insert(index, migration);
                Ok(())
            }
        }
    }

    /// Migrations in ascending version order.
    pub fn migrations(&self) -> &[Migration<D>] {
        &self.migrations
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Highest registered version, or 0 for an empty registry.
    pub fn latest_version(&self) -> u64 {
        self.migrations.last().map_or(0, |m| m.version())
    }

    /// Select the steps a batch would run from `current` version.
    ///
    /// A non-positive `n` selects every eligible migration; a larger `n` than the
    /// registry holds is clamped. Migrations without an action for `direction`
    /// are skipped and do not count toward `n`.
    pub fn plan(
        &self,
        direction: MigrationDirection,
        current: u64,
        n: i64,
    ) -> Vec<PlannedStep<'_, D>> {
        let migrations = self.migrations.as_slice();
        let limit = step_limit(n, migrations.len());

        match direction {
            MigrationDirection::Up => migrations
                .iter()
                .filter(|m| m.version() > current)
                .filter_map(|m| m.action(direction).map(|action| (m, action)))
                .take(limit)
                .map(|(m, action)| PlannedStep {
                    migration: m,
                    action,
                    record_version: m.version(),
                    record_description: m.description(),
                })
                .collect(),
            MigrationDirection::Down => migrations
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, m)| m.version() <= current)
                .filter_map(|(index, m)| m.action(direction).map(|action| (index, m, action)))
                .take(limit)
                .map(move |(index, m, action)| {
                    // Undoing a migration leaves the database at its predecessor.
                    let (record_version, record_description) = match index {
                        0 => (0, ""),
                        _ => {
                            let previous = &migrations[index - 1];
                            (previous.version(), previous.description())
                        }
                    };
                    PlannedStep {
                        migration: m,
                        action,
                        record_version,
                        record_description,
                    }
                })
                .collect(),
        }
    }
}

impl<D> Default for MigrationRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for MigrationRegistry<D> {
    fn clone(&self) -> Self {
        Self {
            migrations: self.migrations.clone(),
        }
    }
}

impl<D> std::fmt::Debug for MigrationRegistry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.migrations).finish()
    }
}

fn step_limit(n: i64, total: usize) -> usize {
    match usize::try_from(n) {
        Ok(n) if n > 0 && n <= total => n,
        _ => total,
    }
}
