//! The per-conversation state machine.

use crate::domain_types::{Address, MessageId, Target};
use crate::error::DialogueError;
use crate::label::DialogueLabel;
use crate::message::{DialogueMessage, Message};
use crate::protocol::ProtocolDescriptor;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// The per-conversation state machine. Holds outgoing/incoming message
/// logs, role, self-initiated flag, and the current label; enforces the
/// three-stage validity pipeline on every message it is asked to record.
///
/// A `Dialogue` never holds a back-reference to the registry that owns it;
/// all cross-object bookkeeping (statistics, label promotion) happens on
/// the registry side.
pub struct Dialogue<D: ProtocolDescriptor> {
    agent_address: Address,
    dialogue_label: DialogueLabel,
    incomplete_dialogue_label: DialogueLabel,
    role: D::Role,
    is_self_initiated: bool,
    outgoing_messages: Vec<Message<D::Performative, D::Content>>,
    incoming_messages: Vec<Message<D::Performative, D::Content>>,
    protocol: Arc<D>,
}

impl<D: ProtocolDescriptor> Dialogue<D> {
    /// Create a new, empty dialogue for `dialogue_label`. `is_self_initiated`
    /// is derived once here by comparing the opponent and starter addresses
    /// for equality.
    #[must_use]
    pub fn new(
        dialogue_label: DialogueLabel,
        agent_address: Address,
        role: D::Role,
        protocol: Arc<D>,
    ) -> Self {
        let is_self_initiated =
            dialogue_label.dialogue_opponent_addr() != dialogue_label.dialogue_starter_addr();
        Self {
            incomplete_dialogue_label: dialogue_label.incomplete(),
            agent_address,
            dialogue_label,
            role,
            is_self_initiated,
            outgoing_messages: Vec::new(),
            incoming_messages: Vec::new(),
            protocol,
        }
    }

    /// The dialogue's current label.
    #[must_use]
    pub fn dialogue_label(&self) -> &DialogueLabel {
        &self.dialogue_label
    }

    /// The incomplete form of the current label (cached; equal to the
    /// current label itself once the dialogue is complete except for the
    /// responder reference being reset to the sentinel).
    #[must_use]
    pub fn incomplete_dialogue_label(&self) -> &DialogueLabel {
        &self.incomplete_dialogue_label
    }

    /// The set of labels a message may be reconstructed to and still belong
    /// to this dialogue: the current label and its incomplete form.
    #[must_use]
    pub fn dialogue_labels(&self) -> HashSet<DialogueLabel> {
        let mut labels = HashSet::with_capacity(2);
        labels.insert(self.dialogue_label.clone());
        labels.insert(self.incomplete_dialogue_label.clone());
        labels
    }

    /// The address of the agent for whom this dialogue is maintained.
    #[must_use]
    pub fn agent_address(&self) -> &Address {
        &self.agent_address
    }

    /// This agent's role in the conversation.
    #[must_use]
    pub fn role(&self) -> &D::Role {
        &self.role
    }

    /// Whether the owning agent initiated this conversation.
    #[must_use]
    pub fn is_self_initiated(&self) -> bool {
        self.is_self_initiated
    }

    /// The protocol descriptor backing this dialogue.
    #[must_use]
    pub fn protocol(&self) -> &D {
        &self.protocol
    }

    /// The last message received from the opponent, if any.
    #[must_use]
    pub fn last_incoming_message(&self) -> Option<&Message<D::Performative, D::Content>> {
        self.incoming_messages.last()
    }

    /// The last message sent by this agent, if any.
    #[must_use]
    pub fn last_outgoing_message(&self) -> Option<&Message<D::Performative, D::Content>> {
        self.outgoing_messages.last()
    }

    /// The message with the greatest `message_id` across both logs.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message<D::Performative, D::Content>> {
        match (self.last_incoming_message(), self.last_outgoing_message()) {
            (Some(incoming), Some(outgoing)) => {
                if outgoing.message_id() > incoming.message_id() {
                    Some(outgoing)
                } else {
                    Some(incoming)
                }
            }
            (Some(incoming), None) => Some(incoming),
            (None, Some(outgoing)) => Some(outgoing),
            (None, None) => None,
        }
    }

    /// The message whose id is `message_id`, if this dialogue has one.
    #[must_use]
    pub fn get_message(
        &self,
        message_id: MessageId,
    ) -> Option<&Message<D::Performative, D::Content>> {
        self.outgoing_messages
            .iter()
            .chain(self.incoming_messages.iter())
            .find(|m| m.message_id() == message_id)
    }

    /// Whether this dialogue has recorded any message yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outgoing_messages.is_empty() && self.incoming_messages.is_empty()
    }

    /// Whether `message`'s sender is this agent.
    #[must_use]
    pub fn is_message_by_self(&self, message: &Message<D::Performative, D::Content>) -> bool {
        message.sender() == Some(&self.agent_address)
    }

    /// Whether `message`'s sender is the opponent.
    #[must_use]
    pub fn is_message_by_other(&self, message: &Message<D::Performative, D::Content>) -> bool {
        !self.is_message_by_self(message)
    }

    /// Check whether `message` belongs to this dialogue by reconstructing
    /// its label and testing membership in [`Self::dialogue_labels`].
    #[must_use]
    pub fn is_belonging_to_dialogue(&self, message: &Message<D::Performative, D::Content>) -> bool {
        let opponent = if self.is_message_by_self(message) {
            message.to()
        } else {
            message.sender()
        };
        let Some(opponent) = opponent else {
            return false;
        };

        let candidate = if self.is_self_initiated {
            DialogueLabel::new(
                message.dialogue_reference().as_incomplete(),
                opponent.clone(),
                self.agent_address.clone(),
            )
        } else {
            DialogueLabel::new(
                message.dialogue_reference().clone(),
                opponent.clone(),
                opponent.clone(),
            )
        };
        self.dialogue_labels().contains(&candidate)
    }

    /// Extend the outgoing/incoming log with `message`, if it belongs to
    /// this dialogue and passes the validity pipeline.
    ///
    /// On egress, if `message`'s sender is unset it is assigned the owning
    /// agent's address before validation runs.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::InvalidDialogueMessage`] if `message` does
    /// not belong to this dialogue or fails any validation stage.
    #[instrument(level = "debug", skip(self, message), fields(dialogue = %self.dialogue_label))]
    pub fn update(
        &mut self,
        mut message: Message<D::Performative, D::Content>,
    ) -> Result<(), DialogueError> {
        if !message.has_sender() {
            message.set_sender(self.agent_address.clone());
        }

        if !self.is_belonging_to_dialogue(&message) {
            tracing::debug!("message does not belong to this dialogue");
            return Err(DialogueError::invalid(
                "message does not belong to this dialogue",
            ));
        }

        self.is_valid_next_message(&message)?;

        if self.is_message_by_self(&message) {
            self.outgoing_messages.push(message);
        } else {
            self.incoming_messages.push(message);
        }
        Ok(())
    }

    /// Reply to `target_message` with a freshly constructed message whose
    /// `message_id = last_message.message_id + 1` and
    /// `target = target_message.message_id`. `sender`/`to` are stamped with
    /// this agent's address and the dialogue's opponent address
    /// respectively.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::ProgrammerError`] if the dialogue is empty,
    /// or [`DialogueError::InvalidDialogueMessage`] if the constructed
    /// reply fails validation.
    pub fn reply(
        &mut self,
        target_message: &Message<D::Performative, D::Content>,
        performative: D::Performative,
        content: D::Content,
    ) -> Result<Message<D::Performative, D::Content>, DialogueError> {
        let Some(last_message) = self.last_message() else {
            return Err(DialogueError::programmer("cannot reply in an empty dialogue"));
        };

        let mut reply = self.protocol.new_message(
            self.dialogue_label.dialogue_reference().clone(),
            last_message.message_id().next(),
            Target::of(target_message.message_id()),
            performative,
            content,
        );
        reply.set_sender(self.agent_address.clone());
        reply.set_to(self.dialogue_label.dialogue_opponent_addr().clone());

        self.update(reply.clone())?;
        Ok(reply)
    }

    /// Replace the current (incomplete) label with `final_label`, iff the
    /// current label's responder reference is unassigned and `final_label`'s
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::LabelCannotBeUpdated`] otherwise.
    pub fn update_dialogue_label(&mut self, final_label: DialogueLabel) -> Result<(), DialogueError> {
        if self.dialogue_label.dialogue_reference().is_incomplete()
            && final_label.dialogue_reference().is_complete()
        {
            self.dialogue_label = final_label;
            Ok(())
        } else {
            Err(DialogueError::LabelCannotBeUpdated {
                current: Box::new(self.dialogue_label.clone()),
                attempted: Box::new(final_label),
            })
        }
    }

    /// The three-stage validity pipeline: basic, additional, then
    /// protocol-specific. Short-circuits on first failure.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`DialogueError::InvalidDialogueMessage`].
    pub fn is_valid_next_message(
        &self,
        message: &Message<D::Performative, D::Content>,
    ) -> Result<(), DialogueError> {
        self.basic_validation(message)?;
        self.additional_validation(message)?;
        self.protocol
            .is_valid(self, message)
            .map_err(DialogueError::invalid)
    }

    fn basic_validation(&self, message: &Message<D::Performative, D::Content>) -> Result<(), DialogueError> {
        let reference = message.dialogue_reference();
        let expected_starter = self.dialogue_label.dialogue_reference().starter_reference();

        let Some(last_message) = self.last_message() else {
            if reference.starter_reference() != expected_starter {
                return Err(DialogueError::invalid(format!(
                    "invalid dialogue_reference[0]: expected {}, found {}",
                    expected_starter,
                    reference.starter_reference()
                )));
            }
            if message.message_id() != MessageId::starting() {
                return Err(DialogueError::invalid(format!(
                    "invalid message_id: expected {}, found {}",
                    MessageId::starting(),
                    message.message_id()
                )));
            }
            if message.target() != Target::starting() {
                return Err(DialogueError::invalid(format!(
                    "invalid target: expected {}, found {}",
                    Target::starting(),
                    message.target()
                )));
            }
            if !self.protocol.initial_performatives().contains(message.performative()) {
                return Err(DialogueError::invalid(format!(
                    "invalid initial performative: {:?} is not in the initial performative set",
                    message.performative()
                )));
            }
            return Ok(());
        };

        if reference.starter_reference() != expected_starter {
            return Err(DialogueError::invalid(format!(
                "invalid dialogue_reference[0]: expected {}, found {}",
                expected_starter,
                reference.starter_reference()
            )));
        }

        let expected_id = last_message.message_id().next();
        if message.message_id() != expected_id {
            return Err(DialogueError::invalid(format!(
                "invalid message_id: expected {}, found {}",
                expected_id,
                message.message_id()
            )));
        }

        if message.target() == Target::starting() {
            return Err(DialogueError::invalid(
                "invalid target: expected a value greater than or equal to 1, found 0",
            ));
        }
        if Target::of(last_message.message_id()) < message.target() {
            return Err(DialogueError::invalid(format!(
                "invalid target: expected a value less than or equal to {}, found {}",
                last_message.message_id(),
                message.target()
            )));
        }

        let Some(target_message) = self.get_message(MessageId::try_new(message.target().into_inner())
            .map_err(|_| DialogueError::invalid("target does not refer to a valid message id"))?)
        else {
            return Err(DialogueError::invalid(format!(
                "this dialogue has no message with id {}",
                message.target()
            )));
        };

        let valid_replies = self.protocol.get_valid_replies(target_message.performative());
        if !valid_replies.contains(message.performative()) {
            return Err(DialogueError::invalid(format!(
                "invalid performative: {:?} is not a valid reply to {:?}",
                message.performative(),
                target_message.performative()
            )));
        }

        Ok(())
    }

    fn additional_validation(&self, message: &Message<D::Performative, D::Content>) -> Result<(), DialogueError> {
        if !self.protocol.additional_validation_enabled() {
            return Ok(());
        }
        if let Some(last_message) = self.last_message() {
            let expected = Target::new(last_message.target().into_inner() + 1);
            if message.target() != expected {
                return Err(DialogueError::invalid(format!(
                    "invalid target: expected {expected}, found {}",
                    message.target()
                )));
            }
        }
        Ok(())
    }

    fn interleave<'a>(
        first: &'a [Message<D::Performative, D::Content>],
        second: &'a [Message<D::Performative, D::Content>],
    ) -> Vec<&'a Message<D::Performative, D::Content>> {
        let mut result = Vec::with_capacity(first.len() + second.len());
        let mut first_iter = first.iter();
        let mut second_iter = second.iter();
        loop {
            match (first_iter.next(), second_iter.next()) {
                (Some(a), Some(b)) => {
                    result.push(a);
                    result.push(b);
                }
                (Some(a), None) => result.push(a),
                (None, Some(b)) => result.push(b),
                (None, None) => break,
            }
        }
        result
    }
}

impl<D: ProtocolDescriptor> fmt::Display for Dialogue<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dialogue Label: {}", self.dialogue_label)?;
        let all_messages = if self.is_self_initiated {
            Self::interleave(&self.outgoing_messages, &self.incoming_messages)
        } else {
            Self::interleave(&self.incoming_messages, &self.outgoing_messages)
        };
        for message in all_messages {
            writeln!(f, "{:?}()", message.performative())?;
        }
        Ok(())
    }
}
