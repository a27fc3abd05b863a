//! Store interface and its Firestore REST and in-memory implementations.
//!
//! Every backend answers the same five calls the tools need and reports
//! failures through the closed `StoreError` set.

pub mod memory;
pub mod rest;

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use firestore_store::Document;
use firestore_store::schema::{CollectionPath, DocumentPath, PathError};
use serde_json::{Map, Value};

use crate::auth::AuthError;

pub use memory::MemoryDocStore;
pub use rest::{FirestoreRestStore, RestStoreOptions};

#[derive(Debug)]
pub enum StoreError {
    Http(Box<reqwest::Error>),
    Api { status: u16, message: String },
    Auth(AuthError),
    Decode(String),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Api { status, message } => write!(f, "Firestore returned {status}: {message}"),
            Self::Auth(err) => write!(f, "{err}"),
            Self::Decode(message) => write!(f, "unexpected Firestore response: {message}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl From<AuthError> for StoreError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<PathError> for StoreError {
    fn from(err: PathError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document store capabilities used by the tools.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches up to `limit` documents in the store's default order.
    async fn run_query(
        &self,
        collection: &CollectionPath,
        limit: usize,
    ) -> StoreResult<Vec<Document>>;

    /// Adds a document under a store-generated id and returns that id.
    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Map<String, Value>,
    ) -> StoreResult<String>;

    /// Lists ids of top-level collections.
    async fn list_collection_ids(&self) -> StoreResult<Vec<String>>;

    /// Fetches a document, `None` when it does not exist.
    async fn get_document(&self, document: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Lists ids of collections nested under a document.
    ///
    /// Firestore answers this for any path, existing or not.
    async fn list_subcollection_ids(&self, document: &DocumentPath) -> StoreResult<Vec<String>>;
}

pub(crate) fn limit_to_i32(limit: usize) -> StoreResult<i32> {
    i32::try_from(limit)
        .map_err(|_| StoreError::InvalidInput("limit exceeds supported range".to_string()))
}
