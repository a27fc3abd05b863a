use firestore_store::schema::CollectionPath;
use firestore_store::{CollectionEntry, ListReply};
use tracing::{error, info, warn};

use super::{FirestoreControlPlane, NOT_INITIALIZED, not_found_message};
use crate::store::{DocumentStore, StoreResult};

impl FirestoreControlPlane {
    /// Lists top-level collections.
    pub async fn list_collections(&self) -> ListReply<CollectionEntry> {
        let Some(store) = self.store("list collections") else {
            return ListReply::error(NOT_INITIALIZED);
        };

        info!("listing collections");
        match store.list_collection_ids().await {
            Ok(ids) => {
                info!(count = ids.len(), "collections listed");
                ListReply::Items(ids.into_iter().map(CollectionEntry::from).collect())
            }
            Err(err) => {
                error!(error = %err, "list collections failed");
                ListReply::error(format!("Failed to list collections: {err}"))
            }
        }
    }

    /// Lists the subcollections of a document.
    ///
    /// The parent is probed first so a missing document is reported as such
    /// instead of as an empty list.
    pub async fn list_subcollections(
        &self,
        collection_name: &str,
        document_id: &str,
    ) -> ListReply<CollectionEntry> {
        let Some(store) = self.store("list subcollections") else {
            return ListReply::error(NOT_INITIALIZED);
        };

        info!(collection = collection_name, id = document_id, "listing subcollections");
        match list_subcollections(store, collection_name, document_id).await {
            Ok(Some(ids)) => {
                info!(
                    collection = collection_name,
                    id = document_id,
                    count = ids.len(),
                    "subcollections listed"
                );
                ListReply::Items(ids.into_iter().map(CollectionEntry::from).collect())
            }
            Ok(None) => {
                warn!(collection = collection_name, id = document_id, "parent document not found");
                ListReply::error(not_found_message(collection_name, document_id))
            }
            Err(err) => {
                error!(
                    collection = collection_name,
                    id = document_id,
                    error = %err,
                    "list subcollections failed"
                );
                ListReply::error(format!(
                    "Failed to list subcollections for '{document_id}' in '{collection_name}': {err}"
                ))
            }
        }
    }
}

async fn list_subcollections(
    store: &dyn DocumentStore,
    collection_name: &str,
    document_id: &str,
) -> StoreResult<Option<Vec<String>>> {
    let document = CollectionPath::parse(collection_name)?.document(document_id)?;
    if store.get_document(&document).await?.is_none() {
        return Ok(None);
    }
    store.list_subcollection_ids(&document).await.map(Some)
}
