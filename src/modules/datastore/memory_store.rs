//! In-process document store for local development and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Datastore, DatastoreError, DatastoreResult, Document, Fields, Patch, Query};

#[derive(Default)]
pub struct MemoryStore {
    // class -> id -> document; ids are UUID v7 so BTreeMap order is insertion order
    classes: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document under a caller-chosen id, replacing any existing one
    pub async fn insert_with_id(&self, class_name: &str, id: &str, fields: Fields) -> Document {
        let now = Utc::now();
        let document = Document {
            id: id.to_string(),
            class_name: class_name.to_string(),
            fields,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.classes
            .write()
            .await
            .entry(class_name.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        document
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, class_name: &str, query: &Query) -> DatastoreResult<Vec<Document>> {
        let classes = self.classes.read().await;
        let Some(documents) = classes.get(class_name) else {
            return Ok(Vec::new());
        };

        let matches = documents
            .values()
            .filter(|doc| query.matches(&doc.fields))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(matches)
    }

    async fn get(&self, class_name: &str, id: &str) -> DatastoreResult<Document> {
        self.classes
            .read()
            .await
            .get(class_name)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| DatastoreError::not_found(class_name, id))
    }

    async fn add(&self, class_name: &str, fields: Fields) -> DatastoreResult<Document> {
        let id = Uuid::now_v7().simple().to_string();
        Ok(self.insert_with_id(class_name, &id, fields).await)
    }

    async fn update(&self, class_name: &str, id: &str, patch: &Patch) -> DatastoreResult<()> {
        let mut classes = self.classes.write().await;
        let document = classes
            .get_mut(class_name)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DatastoreError::not_found(class_name, id))?;

        patch.apply_to(&mut document.fields);
        document.updated_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let store = MemoryStore::new();
        let doc = store
            .add("Category", fields(json!({ "name": "Billing" })))
            .await
            .unwrap();

        let loaded = store.get("Category", &doc.id).await.unwrap();
        assert_eq!(loaded.get_str("name"), Some("Billing"));
        assert!(loaded.created_at.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("Category", "missing", &Patch::new().set("name", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatastoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_applies_set_and_unset() {
        let store = MemoryStore::new();
        store
            .insert_with_id(
                "Category",
                "c1",
                fields(json!({ "name": "A", "description": "old" })),
            )
            .await;

        store
            .update(
                "Category",
                "c1",
                &Patch::new().set("name", "B").unset("description"),
            )
            .await
            .unwrap();

        let doc = store.get("Category", "c1").await.unwrap();
        assert_eq!(doc.get_str("name"), Some("B"));
        assert_eq!(doc.get_str("description"), None);
    }

    #[tokio::test]
    async fn test_find_filters_and_limits() {
        let store = MemoryStore::new();
        for name in ["a", "b", "c"] {
            store
                .add("Category", fields(json!({ "name": name, "active": true })))
                .await
                .unwrap();
        }
        store
            .add("Category", fields(json!({ "name": "d", "active": false })))
            .await
            .unwrap();

        let active = store
            .find("Category", &Query::new().equal_to("active", true))
            .await
            .unwrap();
        assert_eq!(active.len(), 3);

        let limited = store
            .find("Category", &Query::new().limit(2))
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let other = store.find("Webhook", &Query::new()).await.unwrap();
        assert!(other.is_empty());
    }
}
