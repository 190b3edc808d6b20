use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{into_object, merge_fields, DocumentStore, StoreError, StoreResult};

/// In-process document store backed by `DashMap`.
///
/// `set_offline(true)` makes every call fail with [`StoreError::Unavailable`],
/// which is how tests exercise the degraded paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        self.ensure_online()?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> StoreResult<()> {
        self.ensure_online()?;
        let document = Value::Object(into_object(document)?);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Value> {
        self.ensure_online()?;
        // The entry guard holds the shard lock for the whole read-merge-write.
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let mut base = match docs.get(id) {
            Some(existing) => into_object(existing.clone())?,
            None => Map::new(),
        };
        merge_fields(&mut base, fields);
        let merged = Value::Object(base);
        docs.insert(id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.ensure_online()?;
        Ok(self
            .collections
            .get_mut(collection)
            .map(|mut docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        self.ensure_online()?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
