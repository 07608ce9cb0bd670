//! Presentation-facing signals.
//!
//! The core never renders anything. Every observable outcome is emitted as
//! a [`TerminalSignal`] over an unbounded channel; the front-end decides
//! how to draw it (colors, toasts, vibration; not this crate's concern).
//! Each variant maps to a stable message key so user-facing text can be
//! localized and asserted against in tests.

use tokio::sync::mpsc;

use crate::error::{DenyReason, ValidationError};

/// Everything the presentation layer can observe from the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalSignal {
    /// Entry granted; carries the resolved display name, not the typed one.
    EntryGranted { display_name: String },
    /// Entry denied with a distinguishable reason.
    EntryDenied { reason: DenyReason },
    /// An entry attempt arrived while the door was already unlocked and
    /// was dropped without re-arming the relock timer.
    EntryIgnored,
    /// The dwell time elapsed and the door is locked again; input fields
    /// held by the front-end should be reset.
    DoorRelocked,
    /// Admin escalation granted; carries the teacher's display name.
    AdminGranted { display_name: String },
    /// Admin escalation denied (reason intentionally not disclosed).
    AdminDenied,
    /// A credential record was created or overwritten.
    UserSaved,
    /// A credential record was removed.
    UserDeleted,
    /// A create-user form was rejected before any store write.
    ValidationFailed { reason: ValidationError },
}

impl TerminalSignal {
    /// Stable message key for the user-facing rendering of this signal.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::EntryGranted { .. } => "entry.granted",
            Self::EntryDenied { reason } => reason.message_key(),
            Self::EntryIgnored => "entry.ignored",
            Self::DoorRelocked => "entry.relocked",
            Self::AdminGranted { .. } => "admin.granted",
            Self::AdminDenied => "admin.denied",
            Self::UserSaved => "directory.user_saved",
            Self::UserDeleted => "directory.user_deleted",
            Self::ValidationFailed { reason } => reason.message_key(),
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<TerminalSignal>;
pub type SignalReceiver = mpsc::UnboundedReceiver<TerminalSignal>;

/// Create the signal channel shared by the core and the front-end.
pub fn signal_channel() -> (SignalSender, SignalReceiver) {
    mpsc::unbounded_channel()
}
