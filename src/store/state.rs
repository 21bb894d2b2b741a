//! In-process document state shared by the memory and file backends.
//!
//! Documents are JSON objects carrying a store-assigned `_id` that grows with every
//! insert, so insertion order is recoverable regardless of document content.

use super::types::{ContainerKind, ContainerSpec, VersionRecord};
use super::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredContainer {
    kind: ContainerKind,
    #[serde(default)]
    documents: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoreState {
    #[serde(default)]
    last_id: u64,
    #[serde(default)]
    containers: BTreeMap<String, StoredContainer>,
}

fn document_id(document: &Value) -> u64 {
    document.get(ID_FIELD).and_then(Value::as_u64).unwrap_or(0)
}

impl StoreState {
    pub fn list_containers(&self) -> Vec<ContainerSpec> {
        self.containers
            .iter()
            .map(|(name, container)| ContainerSpec {
                name: name.clone(),
                kind: container.kind.clone(),
            })
            .collect()
    }

    pub fn create_container(&mut self, name: &str, kind: ContainerKind) -> Result<(), StoreError> {
        if self.containers.contains_key(name) {
            return Err(StoreError::ContainerExists(name.to_string()));
        }
        self.containers.insert(
            name.to_string(),
            StoredContainer {
                kind,
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn drop_container(&mut self, name: &str) -> bool {
        self.containers.remove(name).is_some()
    }

    /// Insert a document, creating the collection when it does not exist yet.
    pub fn insert_document(&mut self, container: &str, document: Value) -> Result<u64, StoreError> {
        let Value::Object(mut fields) = document else {
            return Err(StoreError::InvalidRecord {
                container: container.to_string(),
                message: "document must be a JSON object".to_string(),
            });
        };

        let entry = self
            .containers
            .entry(container.to_string())
            .or_insert_with(|| StoredContainer {
                kind: ContainerKind::Collection,
                documents: Vec::new(),
            });
        if !entry.kind.is_collection() {
            return Err(StoreError::ReadOnlyContainer(container.to_string()));
        }

        self.last_id += 1;
        let id = self.last_id;
        fields.insert(ID_FIELD.to_string(), Value::from(id));
        entry.documents.push(Value::Object(fields));
        Ok(id)
    }

    /// All documents of a container in insertion order. Unknown containers are empty.
    pub fn documents(&self, container: &str) -> Vec<Value> {
        let mut documents = self
            .containers
            .get(container)
            .map(|c| c.documents.clone())
            .unwrap_or_default();
        documents.sort_by_key(document_id);
        documents
    }

    pub fn append_record(
        &mut self,
        container: &str,
        record: &VersionRecord,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_value(record)?;
        self.insert_document(container, document)?;
        Ok(())
    }

    pub fn most_recent_record(&self, container: &str) -> Result<Option<VersionRecord>, StoreError> {
        let latest = self
            .containers
            .get(container)
            .and_then(|c| c.documents.iter().max_by_key(|d| document_id(d)));

        match latest {
            Some(document) => Ok(Some(serde_json::from_value(document.clone())?)),
            None => Ok(None),
        }
    }

    pub fn records(&self, container: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.documents(container)
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let mut state = StoreState::default();
        let first = state.insert_document("items", json!({"a": 1})).unwrap();
        let second = state.insert_document("other", json!({"b": 2})).unwrap();
        let third = state.insert_document("items", json!({"c": 3})).unwrap();

        assert!(first < second && second < third);
        let docs = state.documents("items");
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0]["_id"], first);
        assert_eq!(docs[1]["c"], 3);
    }

    #[test]
    fn test_insert_rejects_non_objects_and_views() {
        let mut state = StoreState::default();
        assert!(matches!(
            state.insert_document("items", json!([1, 2])),
            Err(StoreError::InvalidRecord { .. })
        ));

        state.create_container("active_users", ContainerKind::View).unwrap();
        assert!(matches!(
            state.insert_document("active_users", json!({})),
            Err(StoreError::ReadOnlyContainer(_))
        ));
    }

    #[test]
    fn test_create_existing_container_fails() {
        let mut state = StoreState::default();
        state.create_container("migrations", ContainerKind::Collection).unwrap();
        assert!(matches!(
            state.create_container("migrations", ContainerKind::Collection),
            Err(StoreError::ContainerExists(_))
        ));
    }

    #[test]
    fn test_most_recent_follows_insertion_not_value() {
        let mut state = StoreState::default();
        state.append_record("migrations", &VersionRecord::new(5, "five")).unwrap();
        state.append_record("migrations", &VersionRecord::new(2, "two")).unwrap();

        let latest = state.most_recent_record("migrations").unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.description, "two");

        let versions: Vec<u64> = state
            .records("migrations")
            .unwrap()
            .iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(versions, vec![5, 2]);
    }

    #[test]
    fn test_most_recent_on_missing_container() {
        let state = StoreState::default();
        assert!(state.most_recent_record("migrations").unwrap().is_none());
        assert!(state.records("migrations").unwrap().is_empty());
    }
}
