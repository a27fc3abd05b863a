use std::sync::Arc;

use firestore_core::services::{StoreContext, StoreInitializer};
use firestore_core::store::MemoryDocStore;
use tracing::warn;

use crate::config::FirestoreMcpConfig;

/// Builds the store context the MCP tools run against.
///
/// Initialization failures do not stop the daemon; the returned context is
/// then unavailable and every tool reports it in-band.
pub async fn build_context(config: &FirestoreMcpConfig) -> Arc<StoreContext> {
    if config.in_memory {
        warn!("FIRESTORE_IN_MEMORY is set; documents live in process memory only");
        let context = StoreContext::ready(Arc::new(MemoryDocStore::new()))
            .with_storage_bucket(config.storage_bucket.clone());
        return Arc::new(context);
    }

    StoreInitializer::firestore(config.init_settings(), config.rest_options())
        .ensure_initialized()
        .await
}
