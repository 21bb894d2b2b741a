use super::types::{ContainerKind, ContainerSpec, VersionRecord};
use super::{DocumentStore, StoreError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::results::CollectionType;
use mongodb::{Client, Database};
use serde::{Deserialize, Serialize};

/// BSON shape of a version record. BSON has no unsigned 64-bit integer, so the
/// version is stored as int64 and the timestamp as a BSON date-time.
#[derive(Debug, Serialize, Deserialize)]
struct MongoVersionRecord {
    version: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    timestamp: BsonDateTime,
}

impl MongoVersionRecord {
    fn from_record(container: &str, record: &VersionRecord) -> Result<Self, StoreError> {
        let version = i64::try_from(record.version).map_err(|_| StoreError::InvalidRecord {
            container: container.to_string(),
            message: format!("version {} does not fit in int64", record.version),
        })?;

        Ok(Self {
            version,
            description: record.description.clone(),
            timestamp: BsonDateTime::from_millis(record.timestamp.timestamp_millis()),
        })
    }

    fn into_record(self, container: &str) -> Result<VersionRecord, StoreError> {
        let invalid = |message: String| StoreError::InvalidRecord {
            container: container.to_string(),
            message,
        };

        let version = u64::try_from(self.version)
            .map_err(|_| invalid(format!("negative version {}", self.version)))?;
        let timestamp = Utc
            .timestamp_millis_opt(self.timestamp.timestamp_millis())
            .single()
            .ok_or_else(|| invalid("timestamp out of range".to_string()))?;

        Ok(VersionRecord {
            version,
            description: self.description,
            timestamp,
        })
    }
}

/// History store backed by a MongoDB database.
///
/// The same handle is passed to migration actions; use [`MongoStore::database`]
/// inside an action to reach the driver directly.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connect to `uri` and use the named database.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        Ok(Self::new(client.database(database)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_containers(&self) -> Result<Vec<ContainerSpec>, StoreError> {
        let mut cursor = self.db.list_collections(None, None).await?;
        let mut containers = Vec::new();

        while let Some(spec) = cursor.try_next().await? {
            let kind = match spec.collection_type {
                CollectionType::Collection => ContainerKind::Collection,
                CollectionType::View => ContainerKind::View,
                CollectionType::Timeseries => ContainerKind::Timeseries,
                #[allow(unreachable_patterns)]
                other => ContainerKind::Other(format!("{:?}", other).to_lowercase()),
            };
            containers.push(ContainerSpec {
                name: spec.name,
                kind,
            });
        }

        Ok(containers)
    }

    async fn create_container(&self, name: &str) -> Result<(), StoreError> {
        self.db.run_command(doc! { "create": name }, None).await?;
        Ok(())
    }

    async fn append_record(
        &self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        let document = MongoVersionRecord::from_record(container, record)?;
        self.db
            .collection::<MongoVersionRecord>(container)
            .insert_one(document, None)
            .await?;
        Ok(())
    }

    async fn most_recent_record(
        &self,
        container: &str,
    ) -> Result<Option<VersionRecord>, StoreError> {
        // The greatest _id is the latest insert.
        let options = FindOneOptions::builder().sort(doc! { "_id": -1 }).build();
        let found = self
            .db
            .collection::<MongoVersionRecord>(container)
            .find_one(None, options)
            .await?;

        found.map(|r| r.into_record(container)).transpose()
    }

    async fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let cursor = self
            .db
            .collection::<MongoVersionRecord>(container)
            .find(None, options)
            .await?;
        let documents: Vec<MongoVersionRecord> = cursor.try_collect().await?;

        documents
            .into_iter()
            .map(|r| r.into_record(container))
            .collect()
    }
}
