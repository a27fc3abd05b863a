//! MCP server implementation for firestore-mcp.
//!
//! This crate wires the Firestore control plane into rmcp tool handlers and
//! exposes the stdio and streamable HTTP runners.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use firestore_core::control::FirestoreControlPlane;
use firestore_core::services::StoreContext;
use rmcp::{
    ErrorData,
    ServerHandler,
    handler::server::tool::ToolRouter,
    tool,
    tool_handler,
    tool_router,
};
use rmcp::model::{CallToolResult, ServerCapabilities, ServerInfo};
use serde::Serialize;

pub use tools::collections::ListSubcollectionsParams;
pub use tools::documents::{AddDocumentParams, GetDocumentParams, QueryCollectionParams};

const SERVER_INSTRUCTIONS: &str = r"firestore-mcp exposes a Firebase Firestore database as MCP tools.

Tools:
- `list_firestore_collections` lists top-level collections.
- `query_firestore_collection` returns up to `limit` documents (default 50) from a collection.
- `get_firestore_document` fetches one document by id.
- `add_document_to_firestore` adds a document with a generated id.
- `list_document_subcollections` lists the subcollections of a document.

Notes:
- Every returned document includes its id under the `id` key.
- `collection_name` may be a nested path such as `users/u1/orders`.
- Failures are reported inside the result with an `error` field; `add_document_to_firestore`
  also sets `success` to false.
- `health` reports whether the Firestore client initialized.";

/// Health payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub firestore: &'static str,
}

/// MCP server wrapper around the control plane and tool routers.
#[derive(Clone)]
pub struct FirestoreMcp {
    tool_router: ToolRouter<Self>,
    control: FirestoreControlPlane,
}

impl FirestoreMcp {
    /// Creates a new server over an initialized store context.
    #[must_use]
    pub fn new(context: Arc<StoreContext>) -> Self {
        Self::with_control(FirestoreControlPlane::new(context))
    }

    /// Creates a new server from an existing control plane.
    #[must_use]
    pub fn with_control(control: FirestoreControlPlane) -> Self {
        let tool_router = Self::tool_router_core()
            + Self::tool_router_documents()
            + Self::tool_router_collections();
        Self {
            tool_router,
            control,
        }
    }

    pub(crate) const fn control(&self) -> &FirestoreControlPlane {
        &self.control
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl FirestoreMcp {
    #[tool(description = "Health check. Reports whether the Firestore client is initialized.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        helpers::json_reply(HealthReport {
            status: "ok",
            firestore: self.control.context().state().as_str(),
        })
    }
}

#[tool_handler]
impl ServerHandler for FirestoreMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use firestore_core::services::InitState;
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn health_reports_initialization_state() {
        let server = FirestoreMcp::new(Arc::new(StoreContext::unavailable(
            InitState::CredentialFileMissing,
        )));

        let result = server.health().await.unwrap();
        let text = result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|content| content.text.clone())
            .expect("health returns text content");
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value, json!({"status": "ok", "firestore": "credential_file_missing"}));
    }
}
