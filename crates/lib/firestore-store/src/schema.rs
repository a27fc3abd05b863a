use std::error::Error;
use std::fmt;

pub const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1/";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_QUERY_LIMIT: i64 = 50;
pub const LIST_COLLECTIONS_PAGE_SIZE: i32 = 300;

/// Returns the resource name of a database, e.g. `projects/p/databases/(default)`.
#[must_use]
pub fn database_name(project_id: &str, database_id: &str) -> String {
    format!("projects/{project_id}/databases/{database_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    EmptySegment(String),
    NotACollection(String),
    InvalidDocumentId(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "collection path is empty"),
            Self::EmptySegment(path) => write!(f, "path '{path}' contains an empty segment"),
            Self::NotACollection(path) => {
                write!(f, "path '{path}' names a document, not a collection")
            }
            Self::InvalidDocumentId(id) => write!(f, "invalid document id '{id}'"),
        }
    }
}

impl Error for PathError {}

/// Collection path relative to the database's `documents` root.
///
/// Top-level collections have one segment; subcollections alternate
/// collection and document ids (`users/u1/orders`), so the segment count is odd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    /// Parses a slash separated collection path.
    ///
    /// # Errors
    /// Returns `PathError` for empty paths, empty segments, or paths naming a document.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let trimmed = path.trim_matches('/');
        if trimmed.trim().is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<String> = trimmed.split('/').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(PathError::EmptySegment(path.to_string()));
        }
        if segments.len() % 2 == 0 {
            return Err(PathError::NotACollection(path.to_string()));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, which is the collection id Firestore queries by.
    #[must_use]
    pub fn collection_id(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Segments of the parent document, empty for top-level collections.
    #[must_use]
    pub fn parent_segments(&self) -> &[String] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }

    /// Joined path, used as a key by the in-memory store.
    #[must_use]
    pub fn key(&self) -> String {
        self.segments.join("/")
    }

    /// Resolves a document inside this collection.
    ///
    /// # Errors
    /// Returns `PathError::InvalidDocumentId` when the id is empty, `.`/`..`, or contains `/`.
    pub fn document(&self, id: &str) -> Result<DocumentPath, PathError> {
        validate_document_id(id)?;
        Ok(DocumentPath {
            collection: self.clone(),
            id: id.to_string(),
        })
    }
}

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl DocumentPath {
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        self.collection
            .segments()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.id.as_str()))
            .collect()
    }

    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.collection.key(), self.id)
    }
}

fn validate_document_id(id: &str) -> Result<(), PathError> {
    if id.trim().is_empty() || id == "." || id == ".." || id.contains('/') {
        return Err(PathError::InvalidDocumentId(id.to_string()));
    }
    Ok(())
}
