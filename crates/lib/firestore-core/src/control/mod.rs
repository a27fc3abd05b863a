use std::sync::Arc;

use tracing::warn;

use crate::services::StoreContext;
use crate::store::DocumentStore;

pub mod collections;
pub mod documents;

/// Error text returned by every tool while no store handle exists.
pub const NOT_INITIALIZED: &str =
    "Firestore not initialized. Check server logs and serviceAccountKey.json.";

pub(crate) fn not_found_message(collection: &str, document_id: &str) -> String {
    format!("Document '{document_id}' not found in '{collection}'.")
}

/// Tool semantics over the shared store context.
///
/// Operations never fail: not-initialized, not-found, and store errors are
/// all returned as error payloads.
#[derive(Clone)]
pub struct FirestoreControlPlane {
    context: Arc<StoreContext>,
}

impl FirestoreControlPlane {
    #[must_use]
    pub const fn new(context: Arc<StoreContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    fn store(&self, operation: &str) -> Option<&dyn DocumentStore> {
        let store = self.context.store();
        if store.is_none() {
            warn!(operation, "Firestore client not initialized");
        }
        store
    }
}
