//! Generic document collections.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::StoreError;

/// Field that carries a document's identifier.
pub const ID_FIELD: &str = "_id";

/// A stored JSON object, always carrying an `_id` field.
pub type Document = Map<String, Value>;

/// Collection-oriented document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose fields equal every entry in `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &HashMap<String, String>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a JSON object, assigning it a fresh `_id`.
    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError>;

    /// Merge `patch` into the document with `id`. `None` if it does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Delete the document with `id`. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// Process-local collections, insertion ordered.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<DashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn into_object(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Query strings are untyped, so non-string fields compare by their JSON text.
fn field_matches(doc: &Document, key: &str, expected: &str) -> bool {
    match doc.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

fn has_id(doc: &Document, id: &str) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &HashMap<String, String>,
    ) -> Result<Vec<Document>, StoreError> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|doc| filter.iter().all(|(k, v)| field_matches(doc, k, v)))
            .cloned()
            .collect())
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<Document, StoreError> {
        let mut doc = into_object(body)?;
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Option<Document>, StoreError> {
        let patch = into_object(patch)?;
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(doc) = docs.iter_mut().find(|doc| has_id(doc, id)) else {
            return Ok(None);
        };

        for (key, value) in patch {
            if key != ID_FIELD {
                doc.insert(key, value);
            }
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| !has_id(doc, id));
        Ok(docs.len() != before)
    }
}
