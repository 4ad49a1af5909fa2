//! # dialogue-core
//!
//! Protocol-agnostic dialogue management for a message-passing agent
//! framework: dialogue labels, a per-conversation validity state machine,
//! and a per-agent registry that dispatches inbound messages and tracks
//! end-state statistics.
//!
//! The core never names a concrete performative enum, role, or end-state
//! type. A protocol plugs in by implementing [`ProtocolDescriptor`] and
//! instantiating [`Message`] with its own performative and content types;
//! [`Dialogues`] and [`Dialogue`] are generic over that descriptor.
//!
//! ```
//! use dialogue_core::DialogueLabel;
//! use std::collections::HashSet;
//!
//! // see tests/ for a complete ProtocolDescriptor implementation and
//! // end-to-end usage of `Dialogues::create`/`Dialogues::update`.
//! let _ = HashSet::<DialogueLabel>::new();
//! ```

pub mod dialogue;
pub mod dialogues;
pub mod domain_types;
pub mod error;
pub mod label;
pub mod message;
pub mod nonce;
pub mod protocol;

pub use crate::dialogue::Dialogue;
pub use crate::dialogues::{DialogueStats, Dialogues};
pub use crate::domain_types::{Address, MessageId, Nonce, Target};
pub use crate::error::DialogueError;
pub use crate::label::{
    DialogueLabel, DialogueLabelJson, DialogueLabelParseError, DialogueReference,
    UNASSIGNED_DIALOGUE_REFERENCE,
};
pub use crate::message::{DialogueMessage, Message, Performative};
pub use crate::nonce::generate_dialogue_nonce;
pub use crate::protocol::{DialogueEndState, DialogueRole, ProtocolDescriptor};

// Common imports mirrored by downstream protocol crates.
pub use ::tracing::{debug, error, info, instrument, warn};
pub use serde::{Deserialize, Serialize};
pub use thiserror::Error;
