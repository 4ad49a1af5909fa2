//! Error types for the dialogue core

use crate::label::DialogueLabel;
use thiserror::Error;

/// Errors raised by the dialogue management core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogueError {
    /// `message` fails belonging, basic, additional, or protocol-specific
    /// validation. Raised by `Dialogue::update` and (indirectly)
    /// `Dialogue::reply`.
    #[error("invalid dialogue message: {reason}")]
    InvalidDialogueMessage {
        /// Human-readable reason the message was rejected
        reason: String,
    },

    /// `Dialogues::create` could not produce a valid initial message.
    #[error("cannot create a dialogue with the specified performative and content: {reason}")]
    ConstructionFailure {
        /// Reason the initial message failed validation
        reason: String,
    },

    /// A precondition on a public API was violated: `reply` on an empty
    /// dialogue, or recording an unknown end state. Returned as `Err`
    /// rather than a panic so callers can assert on it in tests.
    ///
    /// `Dialogues::update` enforces its own two preconditions (a self-sent
    /// message, or an unset `to`) via `assert!` instead: those indicate a
    /// caller-side bug rather than recoverable bad input, so unwinding is
    /// acceptable there.
    #[error("programmer error: {reason}")]
    ProgrammerError {
        /// Description of the violated precondition
        reason: String,
    },

    /// `update_dialogue_label` was called with a label that cannot replace
    /// the current one (current is already complete, or the replacement is
    /// still incomplete).
    #[error("dialogue label cannot be updated from {current} to {attempted}")]
    LabelCannotBeUpdated {
        /// The dialogue's current label
        current: Box<DialogueLabel>,
        /// The label that was rejected as a replacement
        attempted: Box<DialogueLabel>,
    },
}

impl DialogueError {
    /// Build a [`DialogueError::InvalidDialogueMessage`] from a reason.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDialogueMessage {
            reason: reason.into(),
        }
    }

    /// Build a [`DialogueError::ProgrammerError`] from a reason.
    #[must_use]
    pub fn programmer(reason: impl Into<String>) -> Self {
        Self::ProgrammerError {
            reason: reason.into(),
        }
    }
}
