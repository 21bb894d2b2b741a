//! Types shared by every history store backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a named container as reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Collection,
    View,
    Timeseries,
    Other(String),
}

impl ContainerKind {
    /// Map a store-reported type name to a kind. An empty type name is a plain collection.
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "" | "collection" => ContainerKind::Collection,
            "view" => ContainerKind::View,
            "timeseries" => ContainerKind::Timeseries,
            other => ContainerKind::Other(other.to_string()),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ContainerKind::Collection)
    }
}

/// A container listed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub kind: ContainerKind,
}

impl ContainerSpec {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ContainerKind::Collection,
        }
    }
}

/// One entry of the append-only version history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl VersionRecord {
    /// Create a record stamped with the current UTC time.
    pub fn new(version: u64, description: impl Into<String>) -> Self {
        Self {
            version,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }
}
