//! In-process `RemoteStore` with live snapshot fan-out.
//!
//! # Invariants
//! - Mutation and the snapshot it produces happen under one lock, so every
//!   subscriber observes snapshots in mutation order.
//! - A failed snapshot read cancels every live subscription; the mutation
//!   that triggered it still reports its own outcome.

use crate::clock::{Clock, SystemClock};
use crate::store::backend::CollectionBackend;
use crate::store::key::validate_key;
use crate::store::push_id::PushIdGenerator;
use crate::store::{
    ChildKey, CollectionEvent, RemoteStore, Snapshot, StoreError, StoreResult, Subscription,
};
use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

struct Inner<B> {
    backend: B,
    subscribers: Vec<UnboundedSender<CollectionEvent>>,
}

/// Collection store running inside this process.
///
/// Backend calls run inline on the calling task under a std mutex; with
/// `SqliteBackend` that is blocking file I/O on the runtime worker.
pub struct LocalStore<B: CollectionBackend> {
    collection: String,
    inner: Mutex<Inner<B>>,
    push_ids: PushIdGenerator,
    clock: Arc<dyn Clock>,
}

impl<B: CollectionBackend> LocalStore<B> {
    /// Creates a store for `collection` using the system clock.
    pub fn new(collection: &str, backend: B) -> StoreResult<Self> {
        Self::with_clock(collection, backend, Arc::new(SystemClock))
    }

    /// Creates a store whose push keys are stamped by `clock`.
    pub fn with_clock(collection: &str, backend: B, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        validate_key(collection)?;
        Ok(Self {
            collection: collection.to_string(),
            inner: Mutex::new(Inner {
                backend,
                subscribers: Vec::new(),
            }),
            push_ids: PushIdGenerator::new(),
            clock,
        })
    }

    /// Collection name this store serves.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of subscriptions still registered.
    ///
    /// Dropped subscriptions are pruned on the next mutation.
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .map(|inner| inner.subscribers.len())
            .unwrap_or(0)
    }

    /// Reads the current collection without subscribing.
    pub fn snapshot(&self) -> StoreResult<Snapshot> {
        let inner = self.lock()?;
        Ok(Snapshot::from(inner.backend.load(&self.collection)?))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner<B>>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn mutate(
        &self,
        op: &'static str,
        key: &str,
        apply: impl FnOnce(&mut B, &str) -> StoreResult<()>,
    ) -> StoreResult<()> {
        validate_key(key)?;
        let mut inner = self.lock()?;
        if let Err(err) = apply(&mut inner.backend, &self.collection) {
            warn!(
                "event=child_{op} module=store status=error collection={} key={key} error={err}",
                self.collection
            );
            return Err(err);
        }
        debug!(
            "event=child_{op} module=store status=ok collection={} key={key}",
            self.collection
        );
        self.broadcast(&mut inner);
        Ok(())
    }

    fn broadcast(&self, inner: &mut Inner<B>) {
        match inner.backend.load(&self.collection) {
            Ok(children) => {
                let snapshot = Snapshot::from(children);
                inner.subscribers.retain(|subscriber| {
                    subscriber
                        .send(CollectionEvent::Snapshot(snapshot.clone()))
                        .is_ok()
                });
                debug!(
                    "event=snapshot_broadcast module=store status=ok collection={} children={} subscribers={}",
                    self.collection,
                    snapshot.len(),
                    inner.subscribers.len()
                );
            }
            Err(err) => {
                warn!(
                    "event=snapshot_broadcast module=store status=error collection={} subscribers={} error={err}",
                    self.collection,
                    inner.subscribers.len()
                );
                for subscriber in inner.subscribers.drain(..) {
                    let _ = subscriber.send(CollectionEvent::Cancelled(err.clone()));
                }
            }
        }
    }
}

#[async_trait]
impl<B: CollectionBackend> RemoteStore for LocalStore<B> {
    fn push_key(&self) -> Option<ChildKey> {
        self.push_ids.next_key(self.clock.now_ms())
    }

    async fn set_child(&self, key: &str, value: Value) -> StoreResult<()> {
        self.mutate("set", key, |backend, collection| {
            backend.put(collection, key, &value)
        })
    }

    async fn update_child(&self, key: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.mutate("update", key, |backend, collection| {
            backend.merge(collection, key, &fields)
        })
    }

    async fn remove_child(&self, key: &str) -> StoreResult<()> {
        self.mutate("remove", key, |backend, collection| {
            backend.delete(collection, key)
        })
    }

    fn subscribe(&self) -> StoreResult<Subscription> {
        let mut inner = self.lock()?;
        let snapshot = Snapshot::from(inner.backend.load(&self.collection)?);
        let (sender, subscription) = Subscription::channel();
        sender
            .send(CollectionEvent::Snapshot(snapshot))
            .map_err(|_| StoreError::Disconnected)?;
        inner.subscribers.push(sender);
        debug!(
            "event=subscribe module=store status=ok collection={} subscribers={}",
            self.collection,
            inner.subscribers.len()
        );
        Ok(subscription)
    }
}
