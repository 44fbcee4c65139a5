//! Session-scoped application state.
//!
//! # Responsibility
//! - Hold the note list, compose buffer and edit-dialog flags for one session.
//! - Funnel every change through named, total mutations.
//!
//! # Invariants
//! - Observers only ever see whole snapshots; no mutation is half-applied.
//! - `notes` is always sorted by `created_at` descending.

pub mod app_state;

pub use app_state::{sort_notes_desc, AppState, StateStore};
