//! Typed note adapter over a value-level `RemoteStore`.

use crate::model::note::{validate_note_id, Note, NoteId, NotePatch};
use crate::store::{RemoteStore, StoreResult, Subscription};
use std::sync::Arc;

/// Note-shaped view of one collection.
///
/// Cheap to clone; clones share the underlying store.
pub struct NoteCollection<S: RemoteStore> {
    store: Arc<S>,
}

impl<S: RemoteStore> Clone for NoteCollection<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RemoteStore> NoteCollection<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Underlying value-level store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Allocates a new note id without writing anything.
    pub fn generate_id(&self) -> Option<NoteId> {
        self.store.push_key()
    }

    /// Creates or fully overwrites the child at `note.id`.
    pub async fn write(&self, note: &Note) -> StoreResult<()> {
        note.validate()?;
        self.store.set_child(&note.id, note.to_child()).await
    }

    /// Updates only `content` and `createdAt` of the child at `id`.
    pub async fn patch(&self, id: &str, patch: &NotePatch) -> StoreResult<()> {
        validate_note_id(id)?;
        self.store.update_child(id, patch.to_fields()).await
    }

    /// Deletes the child at `id`.
    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        validate_note_id(id)?;
        self.store.remove_child(id).await
    }

    /// Registers a full-snapshot listener on the collection.
    pub fn subscribe(&self) -> StoreResult<Subscription> {
        self.store.subscribe()
    }
}
