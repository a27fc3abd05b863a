use firestore_store::schema::CollectionPath;
use firestore_store::{AddReply, Document, DocumentRecord, DocumentReply, ListReply};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::{FirestoreControlPlane, NOT_INITIALIZED, not_found_message};
use crate::store::{DocumentStore, StoreError, StoreResult};

impl FirestoreControlPlane {
    /// Fetches up to `limit` documents from a collection, each with its id merged in.
    ///
    /// Documents without fields count toward `limit` but are left out of the reply.
    pub async fn query_collection(
        &self,
        collection_name: &str,
        limit: i64,
    ) -> ListReply<DocumentRecord> {
        let Some(store) = self.store("query collection") else {
            return ListReply::error(NOT_INITIALIZED);
        };

        info!(collection = collection_name, limit, "querying collection");
        match run_query(store, collection_name, limit).await {
            Ok(documents) => {
                let records: Vec<DocumentRecord> = documents
                    .into_iter()
                    .filter(|document| !document.is_empty())
                    .map(Document::into_record)
                    .collect();
                info!(
                    collection = collection_name,
                    count = records.len(),
                    "query returned documents"
                );
                ListReply::Items(records)
            }
            Err(err) => {
                error!(collection = collection_name, error = %err, "query failed");
                ListReply::error(format!(
                    "Failed to query collection '{collection_name}': {err}"
                ))
            }
        }
    }

    /// Adds a document under a generated id.
    pub async fn add_document(
        &self,
        collection_name: &str,
        document_data: Map<String, Value>,
    ) -> AddReply {
        let Some(store) = self.store("add document") else {
            return AddReply::failed(NOT_INITIALIZED);
        };

        info!(collection = collection_name, "adding document");
        match add_document(store, collection_name, document_data).await {
            Ok(id) => {
                info!(collection = collection_name, id = %id, "document added");
                AddReply::added(id, collection_name)
            }
            Err(err) => {
                error!(collection = collection_name, error = %err, "add document failed");
                AddReply::failed(format!(
                    "Failed to add document to '{collection_name}': {err}"
                ))
            }
        }
    }

    /// Fetches a single document by id.
    pub async fn get_document(&self, collection_name: &str, document_id: &str) -> DocumentReply {
        let Some(store) = self.store("get document") else {
            return DocumentReply::error(NOT_INITIALIZED);
        };

        info!(collection = collection_name, id = document_id, "getting document");
        match get_document(store, collection_name, document_id).await {
            Ok(Some(document)) if document.is_empty() => {
                info!(collection = collection_name, id = document_id, "document has no data");
                DocumentReply::empty(document.id)
            }
            Ok(Some(document)) => DocumentReply::Found(document.into_record()),
            Ok(None) => {
                warn!(collection = collection_name, id = document_id, "document not found");
                DocumentReply::error(not_found_message(collection_name, document_id))
            }
            Err(err) => {
                error!(
                    collection = collection_name,
                    id = document_id,
                    error = %err,
                    "get document failed"
                );
                DocumentReply::error(format!(
                    "Failed to get document '{document_id}' from '{collection_name}': {err}"
                ))
            }
        }
    }
}

async fn run_query(
    store: &dyn DocumentStore,
    collection_name: &str,
    limit: i64,
) -> StoreResult<Vec<Document>> {
    let collection = CollectionPath::parse(collection_name)?;
    store.run_query(&collection, query_limit(limit)?).await
}

/// Limits must fit the store's 32-bit count.
fn query_limit(limit: i64) -> StoreResult<usize> {
    i32::try_from(limit)
        .ok()
        .and_then(|limit| usize::try_from(limit).ok())
        .ok_or_else(|| {
            StoreError::InvalidInput(format!(
                "limit must be between 0 and {}, got {limit}",
                i32::MAX
            ))
        })
}

async fn add_document(
    store: &dyn DocumentStore,
    collection_name: &str,
    document_data: Map<String, Value>,
) -> StoreResult<String> {
    let collection = CollectionPath::parse(collection_name)?;
    store.add_document(&collection, document_data).await
}

async fn get_document(
    store: &dyn DocumentStore,
    collection_name: &str,
    document_id: &str,
) -> StoreResult<Option<Document>> {
    let document = CollectionPath::parse(collection_name)?.document(document_id)?;
    store.get_document(&document).await
}
