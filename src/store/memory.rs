use super::{
    DocumentStore, Filter, ID_FIELD, InsertOneResult, ObjectId, StoreError, StoreResult,
    UpdateResult,
};
use crate::gateway::Document;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Process-local document store. Collections are created on first insert and
/// keep insertion order.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    available: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the store going away; every call fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }
}

fn document_id(document: &Document) -> Option<ObjectId> {
    document
        .get(ID_FIELD)
        .and_then(JsonValue::as_str)
        .and_then(|raw| ObjectId::parse_str(raw).ok())
}

fn matches(document: &Document, filter: Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::ById(id) => document_id(document) == Some(id),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_one(
        &self,
        collection: &str,
        mut document: Document,
    ) -> StoreResult<InsertOneResult> {
        self.ensure_available()?;

        let id = ObjectId::new();
        document.insert(ID_FIELD.to_string(), JsonValue::String(id.to_hex()));

        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);

        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: Some(id),
        })
    }

    async fn find_one(&self, collection: &str, filter: Filter) -> StoreResult<Option<Document>> {
        self.ensure_available()?;

        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| matches(doc, filter)))
            .cloned())
    }

    async fn find(&self, collection: &str, filter: Filter) -> StoreResult<Vec<Document>> {
        self.ensure_available()?;

        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|doc| matches(doc, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        patch: Document,
    ) -> StoreResult<UpdateResult> {
        self.ensure_available()?;

        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| matches(doc, filter)))
        else {
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
            });
        };

        let mut modified = false;
        for (key, value) in patch {
            if key == ID_FIELD {
                continue;
            }
            if document.get(&key) != Some(&value) {
                document.insert(key, value);
                modified = true;
            }
        }

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        value.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn insert_assigns_id_and_find_one_returns_it() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .insert_one("Contact", doc(json!({ "firstName": "Jo" })))
            .await
            .unwrap();

        assert!(result.acknowledged);
        let id = result.inserted_id.expect("id assigned");

        let found = store
            .find_one("Contact", Filter::ById(id))
            .await
            .unwrap()
            .expect("document present");
        assert_eq!(found["firstName"], "Jo");
        assert_eq!(found[ID_FIELD], json!(id.to_hex()));
    }

    #[tokio::test]
    async fn find_all_keeps_insertion_order_per_collection() {
        let store = InMemoryDocumentStore::new();
        for name in ["a", "b", "c"] {
            store
                .insert_one("Contact", doc(json!({ "name": name })))
                .await
                .unwrap();
        }
        store
            .insert_one("Upload", doc(json!({ "name": "other" })))
            .await
            .unwrap();

        let names: Vec<_> = store
            .find("Contact", Filter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("b"), json!("c")]);
        assert!(store.find("Missing", Filter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert_one("Contact", doc(json!({ "firstName": "Jo", "lastName": "Lee" })))
            .await
            .unwrap()
            .inserted_id
            .unwrap();

        let result = store
            .update_one(
                "Contact",
                Filter::ById(id),
                doc(json!({ "lastName": "Li", "_id": "forged" })),
            )
            .await
            .unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);

        let found = store.find_one("Contact", Filter::ById(id)).await.unwrap().unwrap();
        assert_eq!(found["firstName"], "Jo");
        assert_eq!(found["lastName"], "Li");
        assert_eq!(found[ID_FIELD], json!(id.to_hex()));
    }

    #[tokio::test]
    async fn update_of_missing_document_matches_nothing() {
        let store = InMemoryDocumentStore::new();
        let result = store
            .update_one("Contact", Filter::ById(ObjectId::new()), doc(json!({ "a": "b" })))
            .await
            .unwrap();
        assert_eq!(result.matched_count, 0);
        assert!(store.find("Contact", Filter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryDocumentStore::new();
        store.set_available(false);
        assert!(matches!(
            store.find("Contact", Filter::All).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.find("Contact", Filter::All).await.is_ok());
    }
}
