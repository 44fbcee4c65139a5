//! Live collection listener that keeps `StateStore::notes` current.
//!
//! # Invariants
//! - At most one subscription per listener; a second `attach` is rejected
//!   until `shutdown`.
//! - Each snapshot replaces the note list in exactly one state mutation.
//! - `Cancelled` ends the pump after one notice; the list is not cleared.

use crate::notify::{Notice, NoticeKind, Notifier};
use crate::state::StateStore;
use crate::store::{CollectionEvent, NoteCollection, RemoteStore, StoreError, Subscription};
use crate::sync::reconcile::reconcile;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Subscription lifecycle of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Unsubscribed,
    Subscribed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    AlreadySubscribed,
    Subscribe(StoreError),
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadySubscribed => write!(f, "listener is already subscribed"),
            Self::Subscribe(err) => write!(f, "subscribe failed: {err}"),
        }
    }
}

impl Error for ListenerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadySubscribed => None,
            Self::Subscribe(err) => Some(err),
        }
    }
}

/// Owns the pump task that applies snapshots to the state store.
///
/// Dropping the listener aborts the pump.
#[derive(Debug)]
pub struct ReconciliationListener {
    state: ListenerState,
    task: Option<JoinHandle<()>>,
}

impl Default for ReconciliationListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationListener {
    pub fn new() -> Self {
        Self {
            state: ListenerState::Unsubscribed,
            task: None,
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    /// Whether the pump has stopped (cancelled, store gone, or shut down).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Subscribes to `notes` and starts applying snapshots to `state`.
    ///
    /// Must run inside a Tokio runtime. A subscribe failure is also sent to
    /// `notifier`; the listener then stays `Unsubscribed`.
    pub fn attach<S: RemoteStore + 'static>(
        &mut self,
        notes: &NoteCollection<S>,
        state: Arc<StateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<(), ListenerError> {
        if self.state == ListenerState::Subscribed {
            return Err(ListenerError::AlreadySubscribed);
        }

        let subscription = match notes.subscribe() {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!("event=listener_attach module=sync status=error error={err}");
                notifier.notify(Notice::with_detail(
                    NoticeKind::ListenerFailed,
                    err.to_string(),
                ));
                return Err(ListenerError::Subscribe(err));
            }
        };

        self.task = Some(tokio::spawn(pump(subscription, state, notifier)));
        self.state = ListenerState::Subscribed;
        info!("event=listener_attach module=sync status=ok");
        Ok(())
    }

    /// Stops applying snapshots and allows a later `attach`.
    ///
    /// The state keeps its last list.
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("event=listener_shutdown module=sync status=ok");
        }
        self.state = ListenerState::Unsubscribed;
    }
}

impl Drop for ReconciliationListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn pump(mut subscription: Subscription, state: Arc<StateStore>, notifier: Arc<dyn Notifier>) {
    while let Some(event) = subscription.next_event().await {
        match event {
            CollectionEvent::Snapshot(snapshot) => {
                let outcome = reconcile(&snapshot);
                for err in &outcome.skipped {
                    debug!("event=child_decode module=sync status=skipped error={err}");
                }
                debug!(
                    "event=snapshot_apply module=sync status=ok children={} notes={} skipped={}",
                    snapshot.len(),
                    outcome.notes.len(),
                    outcome.skipped.len()
                );
                state.replace_notes(outcome.notes);
            }
            CollectionEvent::Cancelled(err) => {
                warn!("event=listener_cancelled module=sync status=error error={err}");
                notifier.notify(Notice::with_detail(
                    NoticeKind::ListenerFailed,
                    err.to_string(),
                ));
                return;
            }
        }
    }
    info!("event=listener_closed module=sync status=ok reason=store_dropped");
}
