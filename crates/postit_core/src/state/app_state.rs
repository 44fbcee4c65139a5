//! Application state snapshot and its single-writer store.

use crate::model::note::Note;
use tokio::sync::watch;

/// One immutable view of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    /// In-progress compose/edit buffer.
    pub draft_content: String,
    /// Local projection of the remote collection, newest first.
    pub notes: Vec<Note>,
    pub edit_dialog_open: bool,
    /// Note targeted by edit/delete, or `Note::empty()`.
    pub focused_note: Note,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            draft_content: String::new(),
            notes: Vec::new(),
            edit_dialog_open: false,
            focused_note: Note::empty(),
        }
    }
}

/// Sorts newest first. Stable, so equal timestamps keep their input order.
pub fn sort_notes_desc(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Owner of the session state.
///
/// Each mutation computes a new `AppState` from the previous one and
/// publishes it under the watch channel's write lock.
#[derive(Debug)]
pub struct StateStore {
    sender: watch::Sender<AppState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(AppState::default());
        Self { sender }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.sender.borrow().clone()
    }

    /// Observer that wakes on every published state.
    pub fn watch(&self) -> watch::Receiver<AppState> {
        self.sender.subscribe()
    }

    pub fn set_draft_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.apply(|state| AppState {
            draft_content: content,
            ..state.clone()
        });
    }

    pub fn clear_notes(&self) {
        self.apply(|state| AppState {
            notes: Vec::new(),
            ..state.clone()
        });
    }

    /// Appends one note and re-sorts the list.
    pub fn push_note(&self, note: Note) {
        self.apply(|state| {
            let mut notes = state.notes.clone();
            notes.push(note);
            sort_notes_desc(&mut notes);
            AppState {
                notes,
                ..state.clone()
            }
        });
    }

    /// Replaces the whole list in one step.
    pub fn replace_notes(&self, mut notes: Vec<Note>) {
        sort_notes_desc(&mut notes);
        self.apply(|state| AppState {
            notes,
            ..state.clone()
        });
    }

    pub fn toggle_edit_dialog(&self) {
        self.apply(|state| AppState {
            edit_dialog_open: !state.edit_dialog_open,
            ..state.clone()
        });
    }

    pub fn set_edit_dialog_open(&self, open: bool) {
        self.apply(|state| AppState {
            edit_dialog_open: open,
            ..state.clone()
        });
    }

    pub fn set_focused_note(&self, note: Note) {
        self.apply(|state| AppState {
            focused_note: note,
            ..state.clone()
        });
    }

    pub fn clear_focused_note(&self) {
        self.set_focused_note(Note::empty());
    }

    fn apply(&self, next: impl FnOnce(&AppState) -> AppState) {
        self.sender.send_modify(|state| *state = next(state));
    }
}
