//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls, state mutations and notices per user intent.
//! - Keep presentation layers decoupled from store and sync details.

pub mod note_session;
