use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::auth::ServiceAccountKey;
use crate::store::{DocumentStore, FirestoreRestStore, RestStoreOptions, StoreResult};

pub type BuildStoreFuture = BoxFuture<'static, StoreResult<Arc<dyn DocumentStore>>>;
pub type BuildStoreFn = Arc<dyn Fn(PathBuf) -> BuildStoreFuture + Send + Sync + 'static>;

/// Terminal outcome of store initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    CredentialFileMissing,
    CredentialsInvalid,
    Ready,
}

impl InitState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CredentialFileMissing => "credential_file_missing",
            Self::CredentialsInvalid => "credentials_invalid",
            Self::Ready => "ready",
        }
    }
}

/// Result of initialization shared with every tool call.
///
/// Holds the store handle when initialization succeeded; the handle is never
/// replaced afterwards.
pub struct StoreContext {
    store: Option<Arc<dyn DocumentStore>>,
    state: InitState,
    storage_bucket: Option<String>,
}

impl StoreContext {
    #[must_use]
    pub fn ready(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store: Some(store),
            state: InitState::Ready,
            storage_bucket: None,
        }
    }

    #[must_use]
    pub const fn unavailable(state: InitState) -> Self {
        Self {
            store: None,
            state,
            storage_bucket: None,
        }
    }

    #[must_use]
    pub fn with_storage_bucket(mut self, storage_bucket: Option<String>) -> Self {
        self.storage_bucket = storage_bucket;
        self
    }

    #[must_use]
    pub fn store(&self) -> Option<&dyn DocumentStore> {
        self.store.as_deref()
    }

    #[must_use]
    pub const fn state(&self) -> InitState {
        self.state
    }

    #[must_use]
    pub fn storage_bucket(&self) -> Option<&str> {
        self.storage_bucket.as_deref()
    }
}

/// Where the credential file path came from, for startup logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct InitSettings {
    pub credentials_path: PathBuf,
    pub credentials_source: CredentialSource,
    pub storage_bucket: Option<String>,
}

/// Builds the store context once per process.
pub struct StoreInitializer {
    settings: InitSettings,
    build_store: BuildStoreFn,
    context: OnceCell<Arc<StoreContext>>,
}

impl StoreInitializer {
    #[must_use]
    pub fn new(settings: InitSettings, build_store: BuildStoreFn) -> Self {
        Self {
            settings,
            build_store,
            context: OnceCell::new(),
        }
    }

    /// Initializer backed by the Firestore REST store.
    #[must_use]
    pub fn firestore(settings: InitSettings, options: RestStoreOptions) -> Self {
        Self::new(settings, rest_store_builder(options))
    }

    /// Returns the store context, initializing it on first use.
    ///
    /// Never fails: missing or invalid credentials yield a context without a
    /// store handle. Later calls return the first outcome.
    pub async fn ensure_initialized(&self) -> Arc<StoreContext> {
        if let Some(context) = self.context.get() {
            info!("Firebase already initialized; reusing existing store handle");
            return context.clone();
        }
        self.context
            .get_or_init(|| self.initialize())
            .await
            .clone()
    }

    async fn initialize(&self) -> Arc<StoreContext> {
        let settings = &self.settings;
        let path = settings.credentials_path.clone();
        match settings.credentials_source {
            CredentialSource::Environment => {
                info!(path = %path.display(), "using SERVICE_ACCOUNT_KEY_PATH from environment");
            }
            CredentialSource::Fallback => {
                info!(path = %path.display(), "SERVICE_ACCOUNT_KEY_PATH not set, falling back to local file");
            }
        }
        match settings.storage_bucket.as_deref() {
            Some(bucket) => info!(bucket, "FIREBASE_STORAGE_BUCKET from environment"),
            None => info!("FIREBASE_STORAGE_BUCKET environment variable not set"),
        }

        info!("attempting to initialize Firestore client");
        let context = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            match (self.build_store)(path).await {
                Ok(store) => {
                    info!("Firestore client initialized successfully");
                    StoreContext::ready(store)
                }
                Err(err) => {
                    error!(error = %err, "error initializing Firestore client");
                    warn!("Firebase tools will not be available; provide a valid service account key");
                    StoreContext::unavailable(InitState::CredentialsInvalid)
                }
            }
        } else {
            warn!(path = %path.display(), "service account key file not found");
            warn!("Firebase tools will not be available; add serviceAccountKey.json");
            StoreContext::unavailable(InitState::CredentialFileMissing)
        };

        Arc::new(context.with_storage_bucket(settings.storage_bucket.clone()))
    }
}

/// Store builder that reads the key file and connects over REST.
#[must_use]
pub fn rest_store_builder(options: RestStoreOptions) -> BuildStoreFn {
    Arc::new(move |path: PathBuf| -> BuildStoreFuture {
        Box::pin(connect_rest_store(path, options.clone()))
    })
}

async fn connect_rest_store(
    path: PathBuf,
    options: RestStoreOptions,
) -> StoreResult<Arc<dyn DocumentStore>> {
    let key = ServiceAccountKey::from_file(&path).await?;
    let store = FirestoreRestStore::connect(key, &options)?;
    info!(database = store.database(), "Firestore REST client ready");
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::store::{MemoryDocStore, StoreError};

    fn settings(path: PathBuf) -> InitSettings {
        InitSettings {
            credentials_path: path,
            credentials_source: CredentialSource::Environment,
            storage_bucket: Some("demo.appspot.com".to_string()),
        }
    }

    fn counting_builder(calls: Arc<AtomicUsize>, fail: bool) -> BuildStoreFn {
        Arc::new(move |_path: PathBuf| -> BuildStoreFuture {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    return Err(StoreError::InvalidInput("bad credentials".to_string()));
                }
                Ok(Arc::new(MemoryDocStore::new()) as Arc<dyn DocumentStore>)
            })
        })
    }

    fn key_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp key file");
        writeln!(file, "{{}}").expect("write key file");
        file
    }

    #[tokio::test]
    async fn missing_credential_file_leaves_store_unset() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let initializer = StoreInitializer::new(
            settings(dir.path().join("serviceAccountKey.json")),
            counting_builder(calls.clone(), false),
        );

        let context = initializer.ensure_initialized().await;

        assert_eq!(context.state(), InitState::CredentialFileMissing);
        assert!(context.store().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(context.storage_bucket(), Some("demo.appspot.com"));
    }

    #[tokio::test]
    async fn build_failure_marks_credentials_invalid() {
        let file = key_file();
        let calls = Arc::new(AtomicUsize::new(0));
        let initializer = StoreInitializer::new(
            settings(file.path().to_path_buf()),
            counting_builder(calls, true),
        );

        let context = initializer.ensure_initialized().await;

        assert_eq!(context.state(), InitState::CredentialsInvalid);
        assert!(context.store().is_none());
    }

    #[tokio::test]
    async fn initialization_runs_once() {
        let file = key_file();
        let calls = Arc::new(AtomicUsize::new(0));
        let initializer = StoreInitializer::new(
            settings(file.path().to_path_buf()),
            counting_builder(calls.clone(), false),
        );

        let (left, right) = tokio::join!(
            initializer.ensure_initialized(),
            initializer.ensure_initialized()
        );
        let again = initializer.ensure_initialized().await;

        assert!(Arc::ptr_eq(&left, &right));
        assert!(Arc::ptr_eq(&left, &again));
        assert_eq!(left.state(), InitState::Ready);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rest_builder_rejects_malformed_key_file() {
        let file = key_file();
        let initializer = StoreInitializer::firestore(
            settings(file.path().to_path_buf()),
            RestStoreOptions::default(),
        );

        let context = initializer.ensure_initialized().await;

        assert_eq!(context.state(), InitState::CredentialsInvalid);
    }
}
