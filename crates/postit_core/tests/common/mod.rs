#![allow(dead_code)]

use async_trait::async_trait;
use postit_core::store::{
    ChildKey, CollectionEvent, LocalStore, MemoryBackend, RemoteStore, StoreError, StoreResult,
    Subscription,
};
use postit_core::{AppState, Clock, ManualClock, Notice};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const WAIT: Duration = Duration::from_secs(2);

/// In-memory store with switchable failures and call counters.
pub struct ScriptedStore {
    inner: LocalStore<MemoryBackend>,
    pub fail_push_keys: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_subscribe: AtomicBool,
    pub writes: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(clock: Arc<ManualClock>) -> Arc<Self> {
        let clock: Arc<dyn Clock> = clock;
        Arc::new(Self {
            inner: LocalStore::with_clock("Post-it", MemoryBackend::new(), clock).unwrap(),
            fail_push_keys: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        })
    }

    /// Writes a raw child, bypassing failure switches and counters.
    pub async fn seed(&self, key: &str, value: Value) {
        self.inner.set_child(key, value).await.unwrap();
    }

    pub fn child(&self, key: &str) -> Option<Value> {
        self.inner.snapshot().unwrap().get(key).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.inner.snapshot().unwrap().len()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied("Post-it".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    fn push_key(&self) -> Option<ChildKey> {
        if self.fail_push_keys.load(Ordering::SeqCst) {
            return None;
        }
        self.inner.push_key()
    }

    async fn set_child(&self, key: &str, value: Value) -> StoreResult<()> {
        self.check_write()?;
        self.inner.set_child(key, value).await
    }

    async fn update_child(&self, key: &str, fields: Map<String, Value>) -> StoreResult<()> {
        self.check_write()?;
        self.inner.update_child(key, fields).await
    }

    async fn remove_child(&self, key: &str) -> StoreResult<()> {
        self.check_write()?;
        self.inner.remove_child(key).await
    }

    fn subscribe(&self) -> StoreResult<Subscription> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::Disconnected);
        }
        self.inner.subscribe()
    }
}

/// Store whose subscription events are pushed by the test.
#[derive(Default)]
pub struct ChannelStore {
    senders: Mutex<Vec<mpsc::UnboundedSender<CollectionEvent>>>,
}

impl ChannelStore {
    pub fn emit(&self, event: CollectionEvent) {
        for sender in self.senders.lock().unwrap().iter() {
            let _ = sender.send(event.clone());
        }
    }
}

#[async_trait]
impl RemoteStore for ChannelStore {
    fn push_key(&self) -> Option<ChildKey> {
        None
    }

    async fn set_child(&self, _key: &str, _value: Value) -> StoreResult<()> {
        Err(StoreError::Disconnected)
    }

    async fn update_child(&self, _key: &str, _fields: Map<String, Value>) -> StoreResult<()> {
        Err(StoreError::Disconnected)
    }

    async fn remove_child(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Disconnected)
    }

    fn subscribe(&self) -> StoreResult<Subscription> {
        let (sender, subscription) = Subscription::channel();
        self.senders.lock().unwrap().push(sender);
        Ok(subscription)
    }
}

/// Waits until `predicate` holds for the observed state.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<AppState>,
    predicate: impl FnMut(&AppState) -> bool,
) -> AppState {
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("state should reach the expected shape in time")
        .expect("state store should stay alive")
        .clone()
}

pub async fn next_notice(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Notice {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("a notice should arrive in time")
        .expect("notifier should stay alive")
}

pub fn note_ids(state: &AppState) -> Vec<&str> {
    state.notes.iter().map(|note| note.id.as_str()).collect()
}
