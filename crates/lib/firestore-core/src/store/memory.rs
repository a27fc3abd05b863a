use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use firestore_store::Document;
use firestore_store::schema::{CollectionPath, DocumentPath};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, StoreResult, limit_to_i32};

type Fields = Map<String, Value>;

/// In-process document store keyed by collection path.
///
/// Collections exist while they hold at least one document, and a document's
/// subcollections may exist without the document itself, as in Firestore.
#[derive(Default)]
pub struct MemoryDocStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryDocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a document under an explicit id, replacing any previous fields.
    pub async fn insert(&self, document: &DocumentPath, fields: Fields) {
        let mut collections = self.collections.write().await;
        collections
            .entry(document.collection().key())
            .or_default()
            .insert(document.id().to_string(), fields);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn run_query(
        &self,
        collection: &CollectionPath,
        limit: usize,
    ) -> StoreResult<Vec<Document>> {
        limit_to_i32(limit)?;
        let collections = self.collections.read().await;
        let documents = collections
            .get(&collection.key())
            .map(|documents| {
                documents
                    .iter()
                    .take(limit)
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(documents)
    }

    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        let document = collection.document(&id)?;
        self.insert(&document, fields).await;
        Ok(id)
    }

    async fn list_collection_ids(&self) -> StoreResult<Vec<String>> {
        let collections = self.collections.read().await;
        let ids: BTreeSet<&str> = collections
            .keys()
            .filter_map(|key| key.split('/').next())
            .collect();
        Ok(ids.into_iter().map(str::to_string).collect())
    }

    async fn get_document(&self, document: &DocumentPath) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&document.collection().key())
            .and_then(|documents| documents.get(document.id()))
            .map(|fields| Document::new(document.id(), fields.clone())))
    }

    async fn list_subcollection_ids(&self, document: &DocumentPath) -> StoreResult<Vec<String>> {
        let prefix = format!("{}/", document.key());
        let collections = self.collections.read().await;
        Ok(collections
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object fields")
    }

    fn path(collection: &str) -> CollectionPath {
        CollectionPath::parse(collection).unwrap()
    }

    #[tokio::test]
    async fn query_respects_limit() {
        let store = MemoryDocStore::new();
        for n in 0..5 {
            store
                .add_document(&path("items"), fields(json!({"n": n})))
                .await
                .unwrap();
        }

        let limited = store.run_query(&path("items"), 3).await.unwrap();
        let all = store.run_query(&path("items"), 10).await.unwrap();

        assert_eq!(limited.len(), 3);
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn nested_collections_are_scoped_to_their_parent() {
        let store = MemoryDocStore::new();
        let order = path("users/u1/orders").document("o1").unwrap();
        store.insert(&order, fields(json!({"total": 3}))).await;
        let other = path("users/u10/notes").document("n1").unwrap();
        store.insert(&other, fields(json!({}))).await;

        let parent = path("users").document("u1").unwrap();
        let subcollections = store.list_subcollection_ids(&parent).await.unwrap();

        assert_eq!(subcollections, vec!["orders".to_string()]);
        assert!(store.get_document(&parent).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ancestors_of_nested_collections_are_listed() {
        let store = MemoryDocStore::new();
        let order = path("users/orphan/orders").document("o1").unwrap();
        store.insert(&order, fields(json!({"total": 1}))).await;
        let note = path("notes").document("n1").unwrap();
        store.insert(&note, fields(json!({}))).await;

        let ids = store.list_collection_ids().await.unwrap();

        assert_eq!(ids, vec!["notes".to_string(), "users".to_string()]);
    }
}
