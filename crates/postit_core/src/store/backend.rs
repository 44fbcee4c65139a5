//! Synchronous storage backends behind `LocalStore`.
//!
//! Backends only persist children. Key validation, push keys and snapshot
//! fan-out live in `LocalStore`.
//!
//! Write semantics shared by every backend:
//! - `put` with `null` deletes the child.
//! - `merge` with a `null` field removes that field; a child left with no
//!   fields is deleted. Merging into a missing or non-object child starts
//!   from an empty object.

use crate::store::sqlite::SqliteBackend;
use crate::store::{ChildKey, StoreResult};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Persistence for the children of named collections.
pub trait CollectionBackend: Send {
    /// Reads every child of `collection`, ordered by key.
    fn load(&self, collection: &str) -> StoreResult<BTreeMap<ChildKey, Value>>;
    fn put(&mut self, collection: &str, key: &str, value: &Value) -> StoreResult<()>;
    fn merge(
        &mut self,
        collection: &str,
        key: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<()>;
    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()>;
}

/// Applies merge semantics to an existing child value.
///
/// Returns `None` when the merged child has no fields left.
pub fn merge_child(existing: Option<Value>, fields: &Map<String, Value>) -> Option<Value> {
    let mut object = match existing {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    };
    for (field, value) in fields {
        if value.is_null() {
            object.remove(field);
        } else {
            object.insert(field.clone(), value.clone());
        }
    }
    if object.is_empty() {
        None
    } else {
        Some(Value::Object(object))
    }
}

/// Volatile backend; contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: HashMap<String, BTreeMap<ChildKey, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollectionBackend for MemoryBackend {
    fn load(&self, collection: &str) -> StoreResult<BTreeMap<ChildKey, Value>> {
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    fn put(&mut self, collection: &str, key: &str, value: &Value) -> StoreResult<()> {
        if value.is_null() {
            return self.delete(collection, key);
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn merge(
        &mut self,
        collection: &str,
        key: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<()> {
        let children = self.collections.entry(collection.to_string()).or_default();
        if let Some(merged) = merge_child(children.remove(key), fields) {
            children.insert(key.to_string(), merged);
        }
        Ok(())
    }

    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()> {
        if let Some(children) = self.collections.get_mut(collection) {
            children.remove(key);
        }
        Ok(())
    }
}

/// Backend chosen at runtime from configuration.
pub enum AnyBackend {
    Memory(MemoryBackend),
    Sqlite(SqliteBackend),
}

impl CollectionBackend for AnyBackend {
    fn load(&self, collection: &str) -> StoreResult<BTreeMap<ChildKey, Value>> {
        match self {
            Self::Memory(backend) => backend.load(collection),
            Self::Sqlite(backend) => backend.load(collection),
        }
    }

    fn put(&mut self, collection: &str, key: &str, value: &Value) -> StoreResult<()> {
        match self {
            Self::Memory(backend) => backend.put(collection, key, value),
            Self::Sqlite(backend) => backend.put(collection, key, value),
        }
    }

    fn merge(
        &mut self,
        collection: &str,
        key: &str,
        fields: &Map<String, Value>,
    ) -> StoreResult<()> {
        match self {
            Self::Memory(backend) => backend.merge(collection, key, fields),
            Self::Sqlite(backend) => backend.merge(collection, key, fields),
        }
    }

    fn delete(&mut self, collection: &str, key: &str) -> StoreResult<()> {
        match self {
            Self::Memory(backend) => backend.delete(collection, key),
            Self::Sqlite(backend) => backend.delete(collection, key),
        }
    }
}
