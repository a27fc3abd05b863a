use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved key the document id is merged under in returned records.
pub const ID_FIELD: &str = "id";

/// Field mapping returned to tool callers, always carrying `id`.
pub type DocumentRecord = Map<String, Value>;

/// Document read from the store: its store-assigned id plus field data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the document and returns its fields with the id merged in.
    ///
    /// The store id wins over a stored field that is also called `id`.
    #[must_use]
    pub fn into_record(self) -> DocumentRecord {
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(self.id));
        fields
    }
}

/// In-band error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub error: String,
}

impl ErrorEntry {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Identifier of a collection or subcollection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: String,
}

impl From<String> for CollectionEntry {
    fn from(id: String) -> Self {
        Self { id }
    }
}

/// Reply for the listing tools: the items, or a one-element error array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListReply<T> {
    Items(Vec<T>),
    Error(Vec<ErrorEntry>),
}

impl<T> ListReply<T> {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(vec![ErrorEntry::new(message)])
    }

    #[must_use]
    pub fn items(&self) -> Option<&[T]> {
        match self {
            Self::Items(items) => Some(items),
            Self::Error(_) => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Items(_) => None,
            Self::Error(entries) => entries.first().map(|entry| entry.error.as_str()),
        }
    }
}

/// Reply for fetching a single document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentReply {
    Found(DocumentRecord),
    /// The document exists but stores no fields.
    Empty {
        id: String,
        data: Option<DocumentRecord>,
        message: String,
    },
    Error(ErrorEntry),
}

impl DocumentReply {
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorEntry::new(message))
    }

    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self::Empty {
            id: id.into(),
            data: None,
            message: "Document exists but contains no data.".to_string(),
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(entry) => Some(entry.error.as_str()),
            Self::Found(_) | Self::Empty { .. } => None,
        }
    }
}

/// Reply for adding a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AddReply {
    #[must_use]
    pub fn added(id: impl Into<String>, collection: &str) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            message: Some(format!("Document added to '{collection}'")),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            message: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_merges_id_over_stored_field() {
        let fields = json!({"id": "stale", "name": "Ada"})
            .as_object()
            .cloned()
            .expect("object");
        let record = Document::new("abc", fields).into_record();

        assert_eq!(Value::Object(record), json!({"id": "abc", "name": "Ada"}));
    }

    #[test]
    fn list_reply_serializes_as_plain_arrays() {
        let items: ListReply<CollectionEntry> =
            ListReply::Items(vec![CollectionEntry::from("users".to_string())]);
        let failed: ListReply<CollectionEntry> = ListReply::error("boom");

        assert_eq!(serde_json::to_value(items).unwrap(), json!([{"id": "users"}]));
        assert_eq!(serde_json::to_value(failed).unwrap(), json!([{"error": "boom"}]));
    }

    #[test]
    fn empty_document_reply_carries_null_data() {
        let value = serde_json::to_value(DocumentReply::empty("d1")).unwrap();

        assert_eq!(
            value,
            json!({
                "id": "d1",
                "data": null,
                "message": "Document exists but contains no data."
            })
        );
    }

    #[test]
    fn add_reply_omits_unused_fields() {
        let added = serde_json::to_value(AddReply::added("n1", "notes")).unwrap();
        let failed = serde_json::to_value(AddReply::failed("nope")).unwrap();

        assert_eq!(
            added,
            json!({"success": true, "id": "n1", "message": "Document added to 'notes'"})
        );
        assert_eq!(failed, json!({"success": false, "error": "nope"}));
    }
}
