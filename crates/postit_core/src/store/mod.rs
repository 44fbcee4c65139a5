//! Hierarchical collection store contracts and local implementations.
//!
//! # Responsibility
//! - Define the value-level `RemoteStore` contract (push keys, per-child
//!   set/update/remove, live full-snapshot subscription).
//! - Provide the typed `NoteCollection` adapter used by the session.
//! - Provide an in-process store over memory or SQLite backends.
//!
//! # Invariants
//! - Every subscription first receives the current collection, then one full
//!   snapshot per applied mutation. Deltas are never delivered.
//! - `Cancelled` is terminal: no event follows it on that subscription.
//! - Dropping a `Subscription` unregisters it.

use crate::config::{CoreConfig, StoreConfig};
use crate::db::DbError;
use crate::model::note::NoteValidationError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;

pub mod backend;
mod collection;
pub mod key;
mod local;
pub mod push_id;
pub mod sqlite;

pub use backend::{AnyBackend, CollectionBackend, MemoryBackend};
pub use collection::NoteCollection;
pub use key::{validate_key, KeyError};
pub use local::LocalStore;
pub use sqlite::SqliteBackend;

/// Key of one child inside a collection.
pub type ChildKey = String;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation and listener failures.
///
/// Cloneable so one failure can be fanned out to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    InvalidKey(KeyError),
    PermissionDenied(String),
    Backend(String),
    Serialization(String),
    Disconnected,
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(err) => write!(f, "invalid key: {err}"),
            Self::PermissionDenied(path) => write!(f, "permission denied: {path}"),
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
            Self::Serialization(message) => write!(f, "child serialization failed: {message}"),
            Self::Disconnected => write!(f, "store is disconnected"),
            Self::LockPoisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidKey(err) => Some(err),
            _ => None,
        }
    }
}

impl From<KeyError> for StoreError {
    fn from(value: KeyError) -> Self {
        Self::InvalidKey(value)
    }
}

impl From<NoteValidationError> for StoreError {
    fn from(value: NoteValidationError) -> Self {
        match value {
            NoteValidationError::EmptyId => Self::InvalidKey(KeyError::Empty),
            NoteValidationError::InvalidId(err) => Self::InvalidKey(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Backend(value.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Full contents of a collection at one point in time, in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    children: Vec<(ChildKey, Value)>,
}

impl Snapshot {
    pub fn new(children: Vec<(ChildKey, Value)>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterates `(key, value)` pairs in delivery order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.children
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.children
            .iter()
            .find(|(child_key, _)| child_key == key)
            .map(|(_, value)| value)
    }
}

impl From<BTreeMap<ChildKey, Value>> for Snapshot {
    fn from(value: BTreeMap<ChildKey, Value>) -> Self {
        Self::new(value.into_iter().collect())
    }
}

/// One delivery on a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    Snapshot(Snapshot),
    Cancelled(StoreError),
}

/// Receiving side of a live collection listener.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<CollectionEvent>,
}

impl Subscription {
    /// Creates a connected sender/subscription pair.
    pub fn channel() -> (mpsc::UnboundedSender<CollectionEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }

    /// Waits for the next delivery; `None` once the store side is gone.
    pub async fn next_event(&mut self) -> Option<CollectionEvent> {
        self.receiver.recv().await
    }

    /// Returns an already queued delivery without waiting.
    pub fn try_next_event(&mut self) -> Option<CollectionEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Value-level contract of a hierarchical collection store.
///
/// Mutations resolve once the store has applied them; the matching snapshot
/// reaches subscribers independently of that completion.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Allocates a fresh child key without writing. `None` when unavailable.
    fn push_key(&self) -> Option<ChildKey>;
    /// Creates or fully overwrites one child.
    async fn set_child(&self, key: &str, value: Value) -> StoreResult<()>;
    /// Merges the named fields into one child, creating it when missing.
    async fn update_child(&self, key: &str, fields: Map<String, Value>) -> StoreResult<()>;
    /// Deletes one child. Deleting a missing child succeeds.
    async fn remove_child(&self, key: &str) -> StoreResult<()>;
    /// Registers a persistent full-snapshot listener.
    fn subscribe(&self) -> StoreResult<Subscription>;
}

/// Opens the local store selected by `config`.
pub fn open_store(config: &CoreConfig) -> StoreResult<LocalStore<AnyBackend>> {
    let backend = match &config.store {
        StoreConfig::Memory => AnyBackend::Memory(MemoryBackend::new()),
        StoreConfig::Sqlite { path } => AnyBackend::Sqlite(SqliteBackend::open(path)?),
    };
    LocalStore::new(config.collection.as_str(), backend)
}
