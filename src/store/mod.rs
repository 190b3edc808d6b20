//! Document store abstraction.
//!
//! Every record in the back office lives as a JSON object inside a named
//! collection. Transactions, indexing and change feeds belong to the backend;
//! this module only exposes the handful of document operations the services
//! need, plus [`Collection`] for typed access.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;
pub mod sql;

pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Collection names shared by the services
pub mod collections {
    pub const PARTNERS: &str = "partners";
    pub const MATERIALS: &str = "materials";
    pub const ORDERS_RECEIVED: &str = "purchase_orders_received";
    pub const ORDERS_GIVEN: &str = "purchase_orders_given";
    pub const PRODUCTION_LOGS: &str = "production_logs";
    pub const AUDIT_LOGS: &str = "logs";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Document is not a JSON object")]
    NotAnObject,
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Replaces the whole document, creating it when absent.
    async fn set(&self, collection: &str, id: &str, document: Value) -> StoreResult<()>;

    /// Shallow merge of `fields` into the document. Keys not named in
    /// `fields` keep their stored value. Returns the merged document.
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Value>;

    /// Returns `true` when a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>>;

    /// Stores `document` under a freshly generated id and returns the id.
    async fn add(&self, collection: &str, document: Value) -> StoreResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set(collection, &id, document).await?;
        Ok(id)
    }
}

pub(crate) fn into_object(document: Value) -> StoreResult<Map<String, Value>> {
    match document {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

pub(crate) fn merge_fields(base: &mut Map<String, Value>, fields: Map<String, Value>) {
    for (key, value) in fields {
        base.insert(key, value);
    }
}

/// Typed view over one collection.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<T>> {
        match self.store.get(self.name, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, id: &str, record: &T) -> StoreResult<()> {
        let doc = serde_json::to_value(record)?;
        self.store.set(self.name, id, doc).await
    }

    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        self.store.delete(self.name, id).await
    }

    pub async fn list(&self) -> StoreResult<Vec<T>> {
        self.store
            .list(self.name)
            .await?
            .into_iter()
            .map(|(_, doc)| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Swatch {
        id: String,
        shade: String,
    }

    #[tokio::test]
    async fn typed_collection_round_trips_records() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let swatches = Collection::<Swatch>::new(store.clone(), "swatches");

        let indigo = Swatch {
            id: "s-1".into(),
            shade: "indigo".into(),
        };
        swatches.put(&indigo.id, &indigo).await.unwrap();

        assert_eq!(swatches.get("s-1").await.unwrap(), Some(indigo));
        assert_eq!(swatches.get("s-2").await.unwrap(), None);
        assert_eq!(swatches.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn typed_collection_surfaces_shape_mismatch() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store
            .set("swatches", "bad", json!({ "id": "bad", "shade": 42 }))
            .await
            .unwrap();

        let swatches = Collection::<Swatch>::new(store, "swatches");
        let err = swatches.get("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn merge_fields_overwrites_named_keys_only() {
        let mut base = into_object(json!({ "a": 1, "b": 2 })).unwrap();
        let patch = into_object(json!({ "b": 3, "c": 4 })).unwrap();
        merge_fields(&mut base, patch);
        assert_eq!(Value::Object(base), json!({ "a": 1, "b": 3, "c": 4 }));
    }
}
