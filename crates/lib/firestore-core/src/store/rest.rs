use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use firestore_store::Document;
use firestore_store::schema::{
    CollectionPath,
    DEFAULT_DATABASE_ID,
    DocumentPath,
    FIRESTORE_API_BASE,
    LIST_COLLECTIONS_PAGE_SIZE,
    database_name,
};
use firestore_store::value::{FieldMap, decode_fields, encode_fields};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{DocumentStore, StoreError, StoreResult, limit_to_i32};
use crate::auth::{ServiceAccountKey, TokenSource};

const EMULATOR_TOKEN: &str = "owner";

/// Connection options for the Firestore REST backend.
#[derive(Debug, Clone)]
pub struct RestStoreOptions {
    /// Overrides the project id from the service-account key.
    pub project_id: Option<String>,
    pub database_id: String,
    /// `host:port` of a Firestore emulator; requests go there over plain HTTP.
    pub emulator_host: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Default for RestStoreOptions {
    fn default() -> Self {
        Self {
            project_id: None,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
            request_timeout: None,
        }
    }
}

enum Credentials {
    ServiceAccount(Arc<TokenSource>),
    Emulator,
}

/// Firestore backend speaking the v1 REST API.
pub struct FirestoreRestStore {
    http: reqwest::Client,
    base_url: Url,
    database: String,
    credentials: Credentials,
}

impl FirestoreRestStore {
    /// Builds a client for the key's project (or the configured override).
    ///
    /// # Errors
    /// Returns `StoreError` if the HTTP client cannot be built, the private key is
    /// unusable, or the emulator host is not a valid address.
    pub fn connect(key: ServiceAccountKey, options: &RestStoreOptions) -> StoreResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let project_id = options
            .project_id
            .clone()
            .unwrap_or_else(|| key.project_id.clone());
        let database = database_name(&project_id, &options.database_id);
        let tokens = TokenSource::new(key, http.clone())?;

        match options.emulator_host.as_deref() {
            Some(host) => Self::for_emulator(http, host, database),
            None => Ok(Self {
                http,
                base_url: parse_base_url(FIRESTORE_API_BASE)?,
                database,
                credentials: Credentials::ServiceAccount(Arc::new(tokens)),
            }),
        }
    }

    /// Builds a client for a local emulator, which accepts the fixed `owner` token.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidInput` if `host` does not form a valid URL.
    pub fn for_emulator(http: reqwest::Client, host: &str, database: String) -> StoreResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(&format!("http://{host}/v1/"))?,
            database,
            credentials: Credentials::Emulator,
        })
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// URL under the database's `documents` root, optionally with a `:method` suffix.
    pub(crate) fn endpoint(&self, segments: &[&str], method: Option<&str>) -> StoreResult<Url> {
        let mut parts: Vec<String> = self.database.split('/').map(str::to_string).collect();
        parts.push("documents".to_string());
        parts.extend(segments.iter().map(|segment| (*segment).to_string()));
        if let (Some(method), Some(last)) = (method, parts.last_mut()) {
            last.push(':');
            last.push_str(method);
        }

        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                StoreError::InvalidInput(format!("base URL {} cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty().extend(&parts);
        }
        Ok(url)
    }

    async fn dispatch(&self, request: RequestBuilder) -> StoreResult<Response> {
        let request = match &self.credentials {
            Credentials::ServiceAccount(tokens) => request.bearer_auth(tokens.access_token().await?),
            Credentials::Emulator => request.bearer_auth(EMULATOR_TOKEN),
        };
        Ok(request.send().await?)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let response = self.dispatch(request).await?;
        read_json(response).await
    }

    async fn list_ids(&self, segments: &[&str]) -> StoreResult<Vec<String>> {
        let url = self.endpoint(segments, Some("listCollectionIds"))?;
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let body = ListCollectionIdsRequest {
                page_size: LIST_COLLECTIONS_PAGE_SIZE,
                page_token: page_token.take(),
            };
            let page: ListCollectionIdsResponse =
                self.execute(self.http.post(url.clone()).json(&body)).await?;
            ids.extend(page.collection_ids);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl DocumentStore for FirestoreRestStore {
    async fn run_query(
        &self,
        collection: &CollectionPath,
        limit: usize,
    ) -> StoreResult<Vec<Document>> {
        let body = RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection.collection_id().to_string(),
                }],
                limit: limit_to_i32(limit)?,
            },
        };
        let parent: Vec<&str> = collection.parent_segments().iter().map(String::as_str).collect();
        let url = self.endpoint(&parent, Some("runQuery"))?;
        debug!(%url, "running Firestore query");

        let rows: Vec<RunQueryRow> = self.execute(self.http.post(url).json(&body)).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(RestDocument::into_document)
            .collect())
    }

    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Map<String, Value>,
    ) -> StoreResult<String> {
        let segments: Vec<&str> = collection.segments().iter().map(String::as_str).collect();
        let url = self.endpoint(&segments, None)?;
        let body = CreateDocumentRequest {
            fields: encode_fields(&fields),
        };
        let created: RestDocument = self.execute(self.http.post(url).json(&body)).await?;
        Ok(created.into_document().id)
    }

    async fn list_collection_ids(&self) -> StoreResult<Vec<String>> {
        self.list_ids(&[]).await
    }

    async fn get_document(&self, document: &DocumentPath) -> StoreResult<Option<Document>> {
        let url = self.endpoint(&document.segments(), None)?;
        let response = self.dispatch(self.http.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let found: RestDocument = read_json(response).await?;
        Ok(Some(found.into_document()))
    }

    async fn list_subcollection_ids(&self, document: &DocumentPath) -> StoreResult<Vec<String>> {
        self.list_ids(&document.segments()).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> StoreResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status, response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|err| StoreError::Decode(err.to_string()))
}

async fn api_error(status: StatusCode, response: Response) -> StoreError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .map(|parsed| parsed.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                trimmed.to_string()
            }
        });
    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

fn parse_base_url(raw: &str) -> StoreResult<Url> {
    Url::parse(raw).map_err(|err| StoreError::InvalidInput(format!("invalid base URL {raw}: {err}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Serialize)]
struct StructuredQuery {
    from: Vec<CollectionSelector>,
    limit: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: String,
}

/// One element of the `runQuery` response stream; rows without a document
/// only report progress.
#[derive(Deserialize)]
struct RunQueryRow {
    #[serde(default)]
    document: Option<RestDocument>,
}

#[derive(Serialize)]
struct CreateDocumentRequest {
    fields: FieldMap,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsRequest {
    page_size: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RestDocument {
    name: String,
    #[serde(default)]
    fields: FieldMap,
}

impl RestDocument {
    fn into_document(self) -> Document {
        let id = self.name.rsplit('/').next().unwrap_or_default().to_string();
        Document::new(id, decode_fields(self.fields))
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}
