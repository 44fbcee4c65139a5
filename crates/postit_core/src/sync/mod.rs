//! Remote-to-local reconciliation.
//!
//! # Responsibility
//! - Turn full collection snapshots into the local, sorted note list.
//! - Own the single live subscription of a session.
//!
//! # Invariants
//! - The local list only changes through a delivered snapshot.
//! - A child that fails to decode never aborts a reconciliation pass.
//! - Listener failure leaves the local list as it was.

pub mod listener;
pub mod reconcile;

pub use listener::{ListenerError, ListenerState, ReconciliationListener};
pub use reconcile::{reconcile, Reconciled};
