//! One-shot user notifications (toast-style) raised by the core.
//!
//! Notices are fire-and-forget: a notifier must not block and must not fail.

use log::{info, warn};
use tokio::sync::mpsc;

/// What happened, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    NoteAdded,
    AddFailed,
    NoteEdited,
    EditFailed,
    NoteDeleted,
    DeleteFailed,
    /// The store could not allocate an id for a new note.
    IdUnavailable,
    /// Submitted draft was blank.
    EmptyDraft,
    /// Edit requested while no note was focused.
    NoFocusedNote,
    /// The live collection listener failed or could not start.
    ListenerFailed,
}

impl NoticeKind {
    pub fn is_error(self) -> bool {
        !matches!(self, Self::NoteAdded | Self::NoteEdited | Self::NoteDeleted)
    }

    fn headline(self) -> &'static str {
        match self {
            Self::NoteAdded => "Post-it added successfully!",
            Self::AddFailed => "Oops! Something went wrong while adding the post-it!",
            Self::NoteEdited => "Post-it edited successfully!",
            Self::EditFailed => "Oops! Something went wrong while editing this post-it!",
            Self::NoteDeleted => "Post-it deleted successfully!",
            Self::DeleteFailed => "Oops! Something went wrong while deleting this post-it!",
            Self::IdUnavailable => "Something went wrong!",
            Self::EmptyDraft => "Write something before adding a post-it.",
            Self::NoFocusedNote => "Pick a post-it to edit first.",
            Self::ListenerFailed => "An error occurred",
        }
    }
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    /// Underlying error text, when there is one.
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(kind: NoticeKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: NoticeKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }

    /// User-facing text.
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) if self.kind == NoticeKind::ListenerFailed => {
                format!("{}: {detail}", self.kind.headline())
            }
            _ => self.kind.headline().to_string(),
        }
    }
}

/// User-visible notification channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        let detail = notice.detail.as_deref().unwrap_or("-");
        if notice.is_error() {
            warn!(
                "event=notice module=notify status=error kind={:?} detail={detail}",
                notice.kind
            );
        } else {
            info!("event=notice module=notify status=ok kind={:?}", notice.kind);
        }
    }
}

/// Forwards notices to a receiver owned by the presentation layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // A closed receiver means nobody is showing notices anymore.
        if self.sender.send(notice).is_err() {
            warn!("event=notice module=notify status=dropped reason=receiver_closed");
        }
    }
}
