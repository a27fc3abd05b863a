use firestore_store::schema::DEFAULT_QUERY_LIMIT;
use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FirestoreMcp, helpers};

/// Parameters for querying a collection.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueryCollectionParams {
    /// Name (or nested path) of the collection to query.
    pub collection_name: String,
    /// Maximum number of documents to return. Defaults to 50.
    pub limit: Option<i64>,
}

/// Parameters for adding a document.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddDocumentParams {
    /// Collection the document is added to.
    pub collection_name: String,
    /// Fields of the new document.
    pub document_data: Map<String, Value>,
}

/// Parameters for fetching a document by id.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetDocumentParams {
    pub collection_name: String,
    pub document_id: String,
}

#[tool_router(router = tool_router_documents, vis = "pub")]
impl FirestoreMcp {
    #[tool(description = "Retrieve documents from a Firestore collection. Returns up to `limit` documents (default 50), each including its `id`; an empty list if the collection has none.")]
    async fn query_firestore_collection(
        &self,
        Parameters(params): Parameters<QueryCollectionParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let limit = params.limit.unwrap_or(DEFAULT_QUERY_LIMIT);
        let reply = self
            .control()
            .query_collection(&params.collection_name, limit)
            .await;
        helpers::json_reply(reply)
    }

    #[tool(description = "Add a new document with an auto-generated id to a Firestore collection. Returns the success status and the new document id.")]
    async fn add_document_to_firestore(
        &self,
        Parameters(params): Parameters<AddDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let reply = self
            .control()
            .add_document(&params.collection_name, params.document_data)
            .await;
        helpers::json_reply(reply)
    }

    #[tool(description = "Retrieve a specific document from a Firestore collection by its id. The result includes the document `id`.")]
    async fn get_firestore_document(
        &self,
        Parameters(params): Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let reply = self
            .control()
            .get_document(&params.collection_name, &params.document_id)
            .await;
        helpers::json_reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use firestore_core::services::{InitState, StoreContext};
    use firestore_core::store::MemoryDocStore;
    use serde_json::json;

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

    fn memory_server() -> FirestoreMcp {
        FirestoreMcp::new(Arc::new(StoreContext::ready(Arc::new(MemoryDocStore::new()))))
    }

    #[tokio::test]
    async fn add_then_get_round_trips_through_tools() {
        let server = memory_server();
        let data = json!({"title": "Hello", "count": 2});

        let added = server
            .add_document_to_firestore(Parameters(AddDocumentParams {
                collection_name: "posts".to_string(),
                document_data: data.as_object().cloned().unwrap(),
            }))
            .await
            .unwrap();
        let added = payload(&added);
        assert_eq!(added["success"], json!(true));
        let id = added["id"].as_str().unwrap().to_string();

        let fetched = server
            .get_firestore_document(Parameters(GetDocumentParams {
                collection_name: "posts".to_string(),
                document_id: id.clone(),
            }))
            .await
            .unwrap();

        assert_eq!(payload(&fetched), json!({"id": id, "title": "Hello", "count": 2}));
    }

    #[tokio::test]
    async fn query_defaults_limit_and_returns_array() {
        let server = memory_server();

        let result = server
            .query_firestore_collection(Parameters(QueryCollectionParams {
                collection_name: "empty".to_string(),
                limit: None,
            }))
            .await
            .unwrap();

        assert_eq!(payload(&result), json!([]));
    }

    #[tokio::test]
    async fn negative_limit_is_a_tool_result_error() {
        let server = memory_server();
        let params: QueryCollectionParams =
            serde_json::from_value(json!({"collection_name": "posts", "limit": -1}))
                .expect("negative limit decodes");

        let result = server
            .query_firestore_collection(Parameters(params))
            .await
            .unwrap();

        let value = payload(&result);
        let message = value[0]["error"].as_str().expect("error entry");
        assert!(message.starts_with("Failed to query collection 'posts':"));
    }

    #[tokio::test]
    async fn uninitialized_store_is_reported_in_band() {
        let server = FirestoreMcp::new(Arc::new(StoreContext::unavailable(
            InitState::CredentialsInvalid,
        )));

        let result = server
            .add_document_to_firestore(Parameters(AddDocumentParams {
                collection_name: "posts".to_string(),
                document_data: Map::new(),
            }))
            .await
            .unwrap();

        let value = payload(&result);
        assert_eq!(value["success"], json!(false));
        assert!(value["error"].as_str().unwrap().starts_with("Firestore not initialized"));
    }
}
