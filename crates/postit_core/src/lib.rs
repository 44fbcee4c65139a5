//! Core domain logic for the post-it board.
//! Notes live in one remote collection; this crate keeps a sorted local
//! mirror of it and turns user intents into store operations.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod service;
pub mod state;
pub mod store;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Note, NoteDecodeError, NoteId, NotePatch, NoteValidationError};
pub use notify::{ChannelNotifier, LogNotifier, Notice, NoticeKind, Notifier};
pub use service::note_session::{NoteSession, SessionError};
pub use state::{AppState, StateStore};
pub use store::{
    open_store, CollectionEvent, LocalStore, NoteCollection, RemoteStore, Snapshot, StoreError,
    StoreResult, Subscription,
};
pub use sync::{ListenerState, ReconciliationListener};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
