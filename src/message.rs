//! The message interface the core consumes from the transport, and a
//! concrete generic message type implementing it.

use crate::domain_types::{Address, MessageId, Target};
use crate::label::DialogueReference;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A performative token. The core treats performatives as opaque,
/// equatable, hashable values; concrete enums live in protocol code.
pub trait Performative: Clone + Debug + Eq + Hash + Send + Sync {}

impl<T: Clone + Debug + Eq + Hash + Send + Sync> Performative for T {}

/// The message interface consumed from the transport.
///
/// A message must expose a dialogue reference, a message id (≥ 1), a
/// target (≥ 0), a performative, and `sender`/`to` addresses whose
/// presence can be queried before they are assumed set.
pub trait DialogueMessage: Clone + Debug {
    /// The protocol's performative type.
    type Performative: Performative;

    /// The message's dialogue reference.
    fn dialogue_reference(&self) -> &DialogueReference;

    /// Replace the message's dialogue reference (used when completing a
    /// label on the first reply of an opponent-initiated dialogue, or when
    /// stamping the reference onto a freshly constructed message).
    fn set_dialogue_reference(&mut self, reference: DialogueReference);

    /// The message's id within its dialogue.
    fn message_id(&self) -> MessageId;

    /// The id of the message this one targets (0 for the first message).
    fn target(&self) -> Target;

    /// The message's performative.
    fn performative(&self) -> &Self::Performative;

    /// The sender address, if set.
    fn sender(&self) -> Option<&Address>;

    /// Set the sender address.
    fn set_sender(&mut self, sender: Address);

    /// The recipient address, if set.
    fn to(&self) -> Option<&Address>;

    /// Set the recipient address.
    fn set_to(&mut self, to: Address);

    /// Whether the sender has been set.
    fn has_sender(&self) -> bool {
        self.sender().is_some()
    }

    /// Whether the recipient has been set.
    fn has_to(&self) -> bool {
        self.to().is_some()
    }
}

/// A concrete, generic message: performative type `P`, opaque content
/// payload `C`. Protocols instantiate this rather than hand-rolling their
/// own message struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<P, C> {
    dialogue_reference: DialogueReference,
    message_id: MessageId,
    target: Target,
    performative: P,
    /// Protocol-specific payload. The core never inspects this field.
    pub content: C,
    sender: Option<Address>,
    to: Option<Address>,
}

impl<P, C> Message<P, C> {
    /// Build a new message. `sender`/`to` start unset; the dialogue/registry
    /// fills them in on egress.
    pub fn new(
        dialogue_reference: DialogueReference,
        message_id: MessageId,
        target: Target,
        performative: P,
        content: C,
    ) -> Self {
        Self {
            dialogue_reference,
            message_id,
            target,
            performative,
            content,
            sender: None,
            to: None,
        }
    }
}

impl<P: Performative, C: Clone + Debug> DialogueMessage for Message<P, C> {
    type Performative = P;

    fn dialogue_reference(&self) -> &DialogueReference {
        &self.dialogue_reference
    }

    fn set_dialogue_reference(&mut self, reference: DialogueReference) {
        self.dialogue_reference = reference;
    }

    fn message_id(&self) -> MessageId {
        self.message_id
    }

    fn target(&self) -> Target {
        self.target
    }

    fn performative(&self) -> &Self::Performative {
        &self.performative
    }

    fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    fn set_sender(&mut self, sender: Address) {
        self.sender = Some(sender);
    }

    fn to(&self) -> Option<&Address> {
        self.to.as_ref()
    }

    fn set_to(&mut self, to: Address) {
        self.to = Some(to);
    }
}
