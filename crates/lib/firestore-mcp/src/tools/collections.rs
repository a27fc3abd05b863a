use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{FirestoreMcp, helpers};

/// Parameters for listing the subcollections of a document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListSubcollectionsParams {
    /// Collection holding the parent document.
    pub collection_name: String,
    /// Id of the parent document.
    pub document_id: String,
}

#[tool_router(router = tool_router_collections, vis = "pub")]
impl FirestoreMcp {
    #[tool(description = "List all top-level collections in the Firestore database. Each entry contains the collection `id`.")]
    async fn list_firestore_collections(&self) -> Result<CallToolResult, ErrorData> {
        helpers::json_reply(self.control().list_collections().await)
    }

    #[tool(description = "List all subcollections of a Firestore document. Returns an error entry if the document does not exist.")]
    async fn list_document_subcollections(
        &self,
        Parameters(params): Parameters<ListSubcollectionsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let reply = self
            .control()
            .list_subcollections(&params.collection_name, &params.document_id)
            .await;
        helpers::json_reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use firestore_core::services::StoreContext;
    use firestore_core::store::MemoryDocStore;
    use firestore_store::schema::CollectionPath;
    use serde_json::{Map, Value, json};

    use super::*;

    fn payload(result: &CallToolResult) -> Value {
        let text = result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|content| content.text.clone())
            .expect("tool returns text content");
        serde_json::from_str(&text).expect("tool content is JSON")
    }

    async fn seeded_server() -> FirestoreMcp {
        let store = MemoryDocStore::new();
        let user = CollectionPath::parse("users").unwrap().document("u1").unwrap();
        store.insert(&user, Map::new()).await;
        let order = CollectionPath::parse("users/u1/orders")
            .unwrap()
            .document("o1")
            .unwrap();
        store.insert(&order, Map::new()).await;
        FirestoreMcp::new(Arc::new(StoreContext::ready(Arc::new(store))))
    }

    #[tokio::test]
    async fn lists_top_level_collections_only() {
        let server = seeded_server().await;

        let result = server.list_firestore_collections().await.unwrap();

        assert_eq!(payload(&result), json!([{"id": "users"}]));
    }

    #[tokio::test]
    async fn missing_parent_is_an_error_entry() {
        let server = seeded_server().await;

        let result = server
            .list_document_subcollections(Parameters(ListSubcollectionsParams {
                collection_name: "users".to_string(),
                document_id: "nobody".to_string(),
            }))
            .await
            .unwrap();

        assert_eq!(
            payload(&result),
            json!([{"error": "Document 'nobody' not found in 'users'."}])
        );
    }
}
