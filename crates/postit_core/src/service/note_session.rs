//! Note session: add/edit/delete intents over a live collection.
//!
//! # Responsibility
//! - Translate user intents into store operations and state mutations.
//! - Report every store outcome through the notifier exactly once.
//!
//! # Invariants
//! - Store operations are fire-and-forget; callers get a task handle but the
//!   local list only changes when the listener applies the next snapshot.
//! - The draft is cleared as soon as a submission starts, whatever its outcome.
//! - Nothing is written when no id could be allocated.

use crate::clock::{Clock, SystemClock};
use crate::model::note::{Note, NoteId, NotePatch};
use crate::notify::{Notice, NoticeKind, Notifier};
use crate::state::{AppState, StateStore};
use crate::store::{NoteCollection, RemoteStore, StoreResult};
use crate::sync::{ListenerState, ReconciliationListener};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Intents rejected before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The draft is empty or whitespace only.
    EmptyDraft,
    /// The store returned no id for a new note.
    IdUnavailable,
    /// Focused-note edit without a focused note.
    NoFocusedNote,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDraft => write!(f, "draft content is empty"),
            Self::IdUnavailable => write!(f, "store did not allocate a note id"),
            Self::NoFocusedNote => write!(f, "no note is focused"),
        }
    }
}

impl Error for SessionError {}

/// One UI session bound to one collection.
///
/// Must be created inside a Tokio runtime: construction subscribes
/// immediately and every store operation runs as a spawned task.
pub struct NoteSession<S: RemoteStore + 'static> {
    notes: NoteCollection<S>,
    state: Arc<StateStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    listener: ReconciliationListener,
}

impl<S: RemoteStore + 'static> NoteSession<S> {
    /// Starts a session stamped by the system clock.
    pub fn start(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self::start_with_clock(store, notifier, Arc::new(SystemClock))
    }

    /// Starts a session and subscribes to the collection once.
    ///
    /// A subscribe failure is notified and leaves the listener unsubscribed;
    /// the session still accepts intents.
    pub fn start_with_clock(
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let notes = NoteCollection::new(store);
        let state = Arc::new(StateStore::new());
        let mut listener = ReconciliationListener::new();
        // attach() already notified; the session keeps running.
        let _ = listener.attach(&notes, Arc::clone(&state), Arc::clone(&notifier));

        Self {
            notes,
            state,
            notifier,
            clock,
            listener,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> AppState {
        self.state.snapshot()
    }

    /// Observer of every state change.
    pub fn watch(&self) -> watch::Receiver<AppState> {
        self.state.watch()
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Typed collection handle shared with the listener.
    pub fn notes(&self) -> &NoteCollection<S> {
        &self.notes
    }

    pub fn set_draft_content(&self, content: impl Into<String>) {
        self.state.set_draft_content(content);
    }

    /// Submits the draft as a new note.
    ///
    /// # Errors
    /// - `EmptyDraft` when the draft is blank; no id is requested.
    /// - `IdUnavailable` when the store allocates no id; nothing is written
    ///   and the draft is kept.
    pub fn add_note(&self) -> Result<JoinHandle<()>, SessionError> {
        let content = self.state.snapshot().draft_content;
        if content.trim().is_empty() {
            self.notifier.notify(Notice::new(NoticeKind::EmptyDraft));
            return Err(SessionError::EmptyDraft);
        }

        let Some(id) = self.notes.generate_id() else {
            warn!("event=note_add module=service status=error error_code=id_unavailable");
            self.notifier.notify(Notice::new(NoticeKind::IdUnavailable));
            return Err(SessionError::IdUnavailable);
        };

        let note = Note::new(id, content, self.clock.now_ms());
        let notes = self.notes.clone();
        let handle = self.spawn_reported(
            "add",
            note.id.clone(),
            NoticeKind::NoteAdded,
            NoticeKind::AddFailed,
            async move { notes.write(&note).await },
        );
        self.state.set_draft_content("");
        Ok(handle)
    }

    /// Replaces the content of note `id` and re-stamps its `createdAt`.
    ///
    /// Clears the draft and closes the edit dialog right away.
    pub fn edit_note(&self, id: impl Into<NoteId>, content: impl Into<String>) -> JoinHandle<()> {
        let id = id.into();
        let patch = NotePatch::new(content, self.clock.now_ms());
        let notes = self.notes.clone();
        let target = id.clone();
        let handle = self.spawn_reported(
            "edit",
            id,
            NoticeKind::NoteEdited,
            NoticeKind::EditFailed,
            async move { notes.patch(&target, &patch).await },
        );
        self.state.set_draft_content("");
        self.state.set_edit_dialog_open(false);
        handle
    }

    /// Submits the draft as the new content of the focused note.
    pub fn edit_focused_note(&self) -> Result<JoinHandle<()>, SessionError> {
        let state = self.state.snapshot();
        if state.focused_note.is_empty_sentinel() {
            self.notifier.notify(Notice::new(NoticeKind::NoFocusedNote));
            return Err(SessionError::NoFocusedNote);
        }
        Ok(self.edit_note(state.focused_note.id, state.draft_content))
    }

    /// Deletes note `id`. The local list waits for the next snapshot.
    pub fn delete_note(&self, id: impl Into<NoteId>) -> JoinHandle<()> {
        let id = id.into();
        let notes = self.notes.clone();
        let target = id.clone();
        self.spawn_reported(
            "delete",
            id,
            NoticeKind::NoteDeleted,
            NoticeKind::DeleteFailed,
            async move { notes.remove(&target).await },
        )
    }

    /// Focuses `note`, seeds the draft with its content and opens the dialog.
    pub fn open_edit_dialog(&self, note: Note) {
        self.state.set_draft_content(note.content.clone());
        self.state.set_focused_note(note);
        self.state.set_edit_dialog_open(true);
    }

    /// Abandons an edit: clears the draft and closes the dialog.
    pub fn cancel_edit(&self) {
        self.state.set_draft_content("");
        self.state.set_edit_dialog_open(false);
    }

    /// Flips the edit dialog without touching draft or focus.
    pub fn toggle_edit_dialog(&self) {
        self.state.toggle_edit_dialog();
    }

    pub fn set_focused_note(&self, note: Note) {
        self.state.set_focused_note(note);
    }

    fn spawn_reported(
        &self,
        op: &'static str,
        id: NoteId,
        ok_kind: NoticeKind,
        err_kind: NoticeKind,
        work: impl Future<Output = StoreResult<()>> + Send + 'static,
    ) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        info!("event=note_{op} module=service status=start id={id}");
        tokio::spawn(async move {
            match work.await {
                Ok(()) => {
                    info!("event=note_{op} module=service status=ok id={id}");
                    notifier.notify(Notice::new(ok_kind));
                }
                Err(err) => {
                    warn!("event=note_{op} module=service status=error id={id} error={err}");
                    notifier.notify(Notice::with_detail(err_kind, err.to_string()));
                }
            }
        })
    }
}
