use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Collection holding the version history unless configured otherwise.
pub const DEFAULT_MIGRATIONS_COLLECTION: &str = "migrations";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),

    #[error("Operation timeout must be greater than zero")]
    InvalidTimeout,
}

fn default_migrations_collection() -> String {
    DEFAULT_MIGRATIONS_COLLECTION.to_string()
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    /// Collection storing version records. Default is "migrations".
    #[serde(default = "default_migrations_collection")]
    pub migrations_collection: String,
    /// Upper bound for each store call and each migration action, in milliseconds.
    /// Unset means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            migrations_collection: default_migrations_collection(),
            operation_timeout_ms: None,
        }
    }
}

impl MigrateConfig {
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Check the collection name against the document store's naming rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.migrations_collection;
        if name.is_empty()
            || name.contains('$')
            || name.contains('\0')
            || name.starts_with("system.")
        {
            return Err(ConfigError::InvalidCollectionName(name.clone()));
        }

        if self.operation_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Read the configuration file. A missing file yields `None`.
pub async fn read_config(path: &Path) -> Result<Option<MigrateConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let config: MigrateConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(path: &Path, config: &MigrateConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}
