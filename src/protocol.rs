//! The abstract protocol-descriptor contract a concrete protocol plugs
//! into the core.
//!
//! The core depends only on this trait; it never names a concrete
//! performative enum, role, or end-state type. This is the "capability
//! bundle" a protocol injects in place of subclassing a protocol-specific
//! `Dialogue`.

use crate::dialogue::Dialogue;
use crate::message::{DialogueMessage, Message, Performative};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// This agent's position in a conversation, assigned once at creation by
/// [`ProtocolDescriptor::role_from_first_message`]. Opaque to the core
/// beyond equality.
pub trait DialogueRole: Clone + Debug + Eq + Send + Sync {}
impl<T: Clone + Debug + Eq + Send + Sync> DialogueRole for T {}

/// A protocol-defined terminal outcome, used only for statistics. Opaque
/// to the core beyond equality/hash.
pub trait DialogueEndState: Clone + Debug + Eq + Hash + Send + Sync {}
impl<T: Clone + Debug + Eq + Hash + Send + Sync> DialogueEndState for T {}

/// Per-protocol static declarations consumed by the core.
///
/// Implementations are typically a small zero-sized (or config-holding)
/// type, constructed once and shared (e.g. behind an `Arc`) between a
/// [`crate::dialogues::Dialogues`] registry and every [`Dialogue`] it
/// creates.
pub trait ProtocolDescriptor: Send + Sync {
    /// The protocol's performative enumeration.
    type Performative: Performative;
    /// The protocol's role enumeration.
    type Role: DialogueRole;
    /// The protocol's end-state enumeration, used only for statistics.
    type EndState: DialogueEndState;
    /// The opaque payload type carried by this protocol's messages.
    type Content: Clone + Debug + Send + Sync;

    /// Performatives legal as the very first message of a dialogue.
    fn initial_performatives(&self) -> &HashSet<Self::Performative>;

    /// Performatives that end a conversation. Informational only; the
    /// core never enforces this, and a dialogue may continue past a
    /// terminal performative.
    fn terminal_performatives(&self) -> &HashSet<Self::Performative>;

    /// The reply grammar: for each performative, the set of performatives
    /// that may target it. An absent key, or a present key mapping to the
    /// empty set, both mean "no valid replies" (terminal performative);
    /// the two are treated identically by [`Self::get_valid_replies`].
    fn valid_replies(
        &self,
        performative: &Self::Performative,
    ) -> Option<&HashSet<Self::Performative>>;

    /// Convenience accessor over [`Self::valid_replies`] returning an empty
    /// set rather than `None` for an unlisted performative.
    fn get_valid_replies(&self, performative: &Self::Performative) -> HashSet<Self::Performative> {
        self.valid_replies(performative).cloned().unwrap_or_default()
    }

    /// Pure function selecting this agent's role given the dialogue's
    /// first message and the address of the agent for whom the dialogue is
    /// being created (needed to tell, e.g., "I sent this" from "I received
    /// this" apart, since the descriptor itself holds no agent identity).
    fn role_from_first_message(
        &self,
        message: &Message<Self::Performative, Self::Content>,
        receiver_address: &crate::domain_types::Address,
    ) -> Self::Role;

    /// Message factory: construct a message with the fields required for
    /// validation, given the dialogue reference/id/target/performative and
    /// protocol-specific content.
    fn new_message(
        &self,
        dialogue_reference: crate::label::DialogueReference,
        message_id: crate::domain_types::MessageId,
        target: crate::domain_types::Target,
        performative: Self::Performative,
        content: Self::Content,
    ) -> Message<Self::Performative, Self::Content> {
        Message::new(dialogue_reference, message_id, target, performative, content)
    }

    /// Protocol-specific semantic check, run after basic and additional
    /// validation both pass. Content-type and cross-field constraints the
    /// reply grammar cannot express live here.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason the message is invalid.
    fn is_valid(
        &self,
        dialogue: &Dialogue<Self>,
        message: &Message<Self::Performative, Self::Content>,
    ) -> Result<(), String>
    where
        Self: Sized;

    /// Whether the "target the immediate predecessor" additional-validation
    /// rule is enforced for this protocol. Subject to change independent of
    /// basic validation; defaults to enforced.
    fn additional_validation_enabled(&self) -> bool {
        true
    }
}
