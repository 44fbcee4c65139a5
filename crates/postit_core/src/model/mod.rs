//! Domain model for post-it notes.
//!
//! # Responsibility
//! - Define the note value shared by the store adapter, state and sync layers.
//! - Own the wire shape of one collection child (`id`, `content`, `createdAt`).
//!
//! # Invariants
//! - A note `id` is assigned by the store once and never changes.
//! - Children that cannot be decoded are reported as errors, never patched up.

pub mod note;
