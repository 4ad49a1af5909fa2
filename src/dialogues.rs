//! The per-agent dialogues registry.

use crate::dialogue::Dialogue;
use crate::domain_types::{Address, MessageId, Target};
use crate::error::DialogueError;
use crate::label::{DialogueLabel, DialogueReference};
use crate::message::{DialogueMessage, Message};
use crate::nonce::generate_dialogue_nonce;
use crate::protocol::{DialogueEndState, ProtocolDescriptor};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// End-state statistics: two `end_state -> count` histograms, one for
/// self-initiated dialogues and one for opponent-initiated ones.
#[derive(Debug, Clone)]
pub struct DialogueStats<E: DialogueEndState> {
    self_initiated: HashMap<E, u64>,
    other_initiated: HashMap<E, u64>,
}

impl<E: DialogueEndState> DialogueStats<E> {
    /// Initialize a stats tracker over the given set of declared end
    /// states, each starting at zero.
    #[must_use]
    pub fn new(end_states: &HashSet<E>) -> Self {
        Self {
            self_initiated: end_states.iter().cloned().map(|e| (e, 0)).collect(),
            other_initiated: end_states.iter().cloned().map(|e| (e, 0)).collect(),
        }
    }

    /// Counts for self-initiated dialogues.
    #[must_use]
    pub fn self_initiated(&self) -> &HashMap<E, u64> {
        &self.self_initiated
    }

    /// Counts for opponent-initiated dialogues.
    #[must_use]
    pub fn other_initiated(&self) -> &HashMap<E, u64> {
        &self.other_initiated
    }

    /// Record that a dialogue ended in `end_state`.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::ProgrammerError`] if `end_state` was not
    /// declared to [`Self::new`].
    pub fn add_dialogue_endstate(
        &mut self,
        end_state: E,
        is_self_initiated: bool,
    ) -> Result<(), DialogueError> {
        let histogram = if is_self_initiated {
            &mut self.self_initiated
        } else {
            &mut self.other_initiated
        };
        match histogram.get_mut(&end_state) {
            Some(count) => {
                *count += 1;
                Ok(())
            }
            None => Err(DialogueError::programmer(format!(
                "end state {end_state:?} not present"
            ))),
        }
    }
}

/// The per-agent registry: maps label → dialogue, maps incomplete-label →
/// completed-label, allocates nonces, dispatches inbound messages, and
/// records end-state statistics.
pub struct Dialogues<D: ProtocolDescriptor> {
    agent_address: Address,
    protocol: Arc<D>,
    by_label: HashMap<DialogueLabel, Dialogue<D>>,
    incomplete_to_complete: HashMap<DialogueLabel, DialogueLabel>,
    stats: DialogueStats<D::EndState>,
}

impl<D: ProtocolDescriptor> Dialogues<D> {
    /// Create a registry for `agent_address`, backed by `protocol` and
    /// tracking statistics over `end_states`.
    #[must_use]
    pub fn new(agent_address: Address, protocol: Arc<D>, end_states: &HashSet<D::EndState>) -> Self {
        Self {
            agent_address,
            protocol,
            by_label: HashMap::new(),
            incomplete_to_complete: HashMap::new(),
            stats: DialogueStats::new(end_states),
        }
    }

    /// The address of the agent for whom dialogues are maintained.
    #[must_use]
    pub fn agent_address(&self) -> &Address {
        &self.agent_address
    }

    /// End-state statistics.
    #[must_use]
    pub fn dialogue_stats(&self) -> &DialogueStats<D::EndState> {
        &self.stats
    }

    /// Mutable access to end-state statistics, for recording end states as
    /// application code observes terminal performatives (the core does not
    /// observe them itself).
    pub fn dialogue_stats_mut(&mut self) -> &mut DialogueStats<D::EndState> {
        &mut self.stats
    }

    /// All dialogues currently tracked, keyed by their current (most
    /// authoritative) label.
    #[must_use]
    pub fn dialogues(&self) -> &HashMap<DialogueLabel, Dialogue<D>> {
        &self.by_label
    }

    fn is_message_by_self(&self, message: &Message<D::Performative, D::Content>) -> bool {
        message.sender() == Some(&self.agent_address)
    }

    /// Allocate a fresh `(nonce, "")` reference for a new self-initiated
    /// dialogue, without constructing the dialogue itself. Exposed for
    /// callers that need to attach a reference before constructing the
    /// initial message themselves.
    #[must_use]
    pub fn new_self_initiated_dialogue_reference(&self) -> DialogueReference {
        DialogueReference::incomplete(generate_dialogue_nonce().to_string())
    }

    /// Create a dialogue with `counterparty`, with an initial message whose
    /// performative is `performative` and content is `content`.
    ///
    /// # Errors
    ///
    /// Returns [`DialogueError::ConstructionFailure`] if the initial
    /// message fails validation; the partially created dialogue is rolled
    /// back first.
    #[instrument(level = "debug", skip(self, content))]
    pub fn create(
        &mut self,
        counterparty: Address,
        performative: D::Performative,
        content: D::Content,
    ) -> Result<(Message<D::Performative, D::Content>, &mut Dialogue<D>), DialogueError> {
        let reference = self.new_self_initiated_dialogue_reference();
        let mut initial_message = self.protocol.new_message(
            reference.clone(),
            MessageId::starting(),
            Target::starting(),
            performative,
            content,
        );
        initial_message.set_sender(self.agent_address.clone());
        initial_message.set_to(counterparty.clone());

        let role = self
            .protocol
            .role_from_first_message(&initial_message, &self.agent_address);
        let label = self.create_self_initiated(counterparty, reference, role);

        match self.by_label.get_mut(&label).expect("just inserted").update(initial_message.clone()) {
            Ok(()) => {}
            Err(DialogueError::InvalidDialogueMessage { reason }) => {
                self.by_label.remove(&label);
                return Err(DialogueError::ConstructionFailure { reason });
            }
            Err(other) => return Err(other),
        }

        Ok((initial_message, self.by_label.get_mut(&label).expect("just inserted")))
    }

    /// Update the state of dialogues with a new incoming message.
    ///
    /// Creates a new dialogue if the message is the first of a new
    /// opponent-initiated conversation, promotes a self-initiated
    /// dialogue's label if the message completes it, and otherwise routes
    /// to an existing dialogue. Returns `None` if the label is invalid, no
    /// dialogue matches, or the matched dialogue rejects the message.
    ///
    /// # Panics
    ///
    /// Panics if `message`'s sender is this agent's own address, or if
    /// `message.to()` is unset. Both are precondition violations on the
    /// caller's part (this method is for inbound messages only).
    #[instrument(level = "debug", skip(self, message))]
    pub fn update(
        &mut self,
        message: Message<D::Performative, D::Content>,
    ) -> Option<&mut Dialogue<D>> {
        assert!(
            !self.is_message_by_self(&message),
            "Invalid 'update' usage. Update must only be used with a message by another agent."
        );
        assert!(message.has_to(), "the message's 'to' field is not set");

        let reference = message.dialogue_reference().clone();

        let label = if reference.is_invalid() {
            debug!("dropping message with invalid dialogue reference");
            None
        } else if reference.is_incomplete() && message.message_id() == MessageId::starting() {
            Some(self.create_opponent_initiated(&message, reference))
        } else {
            self.complete_dialogue_reference(&message);
            self.get_dialogue_label(&message)
        }?;

        let dialogue = self.by_label.get_mut(&label)?;
        let accepted = dialogue.update(message).is_ok();
        if accepted {
            self.by_label.get_mut(&label)
        } else {
            warn!("inbound message failed dialogue validation; dropping");
            None
        }
    }

    fn complete_dialogue_reference(&mut self, message: &Message<D::Performative, D::Content>) {
        let complete_reference = message.dialogue_reference().clone();
        if complete_reference.is_incomplete() || complete_reference.is_invalid() {
            return;
        }
        let Some(sender) = message.sender() else {
            return;
        };

        let incomplete_label = DialogueLabel::new(
            complete_reference.as_incomplete(),
            sender.clone(),
            self.agent_address.clone(),
        );

        if self.by_label.contains_key(&incomplete_label)
            && !self.incomplete_to_complete.contains_key(&incomplete_label)
        {
            let dialogue = self
                .by_label
                .remove(&incomplete_label)
                .expect("just checked contains_key");
            let final_label = DialogueLabel::new(
                complete_reference,
                incomplete_label.dialogue_opponent_addr().clone(),
                incomplete_label.dialogue_starter_addr().clone(),
            );
            let mut dialogue = dialogue;
            dialogue
                .update_dialogue_label(final_label.clone())
                .expect("incomplete label was just confirmed replaceable");
            self.by_label.insert(final_label.clone(), dialogue);
            self.incomplete_to_complete.insert(incomplete_label, final_label);
        }
    }

    /// Retrieve the label of the dialogue `message` belongs to, promoting
    /// through [`Self::incomplete_to_complete`] if necessary. Tries the
    /// self-initiated candidate label first, then the opponent-initiated
    /// one (the two should never both exist).
    #[must_use]
    pub fn get_dialogue_label(&self, message: &Message<D::Performative, D::Content>) -> Option<DialogueLabel> {
        let opponent = if self.is_message_by_self(message) {
            message.to()
        } else {
            message.sender()
        }?;

        let self_initiated_label = DialogueLabel::new(
            message.dialogue_reference().clone(),
            opponent.clone(),
            self.agent_address.clone(),
        );
        let other_initiated_label = DialogueLabel::new(
            message.dialogue_reference().clone(),
            opponent.clone(),
            opponent.clone(),
        );

        let self_initiated_label = self.latest_label(self_initiated_label);
        let other_initiated_label = self.latest_label(other_initiated_label);

        if self.by_label.contains_key(&self_initiated_label) {
            Some(self_initiated_label)
        } else if self.by_label.contains_key(&other_initiated_label) {
            Some(other_initiated_label)
        } else {
            None
        }
    }

    /// Retrieve the dialogue `message` belongs to.
    #[must_use]
    pub fn get_dialogue(&self, message: &Message<D::Performative, D::Content>) -> Option<&Dialogue<D>> {
        let label = self.get_dialogue_label(message)?;
        self.by_label.get(&label)
    }

    /// Retrieve, mutably, the dialogue `message` belongs to, for replying
    /// to a conversation looked up by something other than `update`'s
    /// return value.
    pub fn get_dialogue_mut(
        &mut self,
        message: &Message<D::Performative, D::Content>,
    ) -> Option<&mut Dialogue<D>> {
        let label = self.get_dialogue_label(message)?;
        self.by_label.get_mut(&label)
    }

    fn latest_label(&self, label: DialogueLabel) -> DialogueLabel {
        self.incomplete_to_complete.get(&label).cloned().unwrap_or(label)
    }

    fn create_self_initiated(
        &mut self,
        dialogue_opponent_addr: Address,
        dialogue_reference: DialogueReference,
        role: D::Role,
    ) -> DialogueLabel {
        assert!(
            dialogue_reference.is_incomplete(),
            "cannot initiate a dialogue with a preassigned responder reference"
        );
        let incomplete_label = DialogueLabel::new(
            dialogue_reference,
            dialogue_opponent_addr,
            self.agent_address.clone(),
        );
        self.insert_new(incomplete_label, role, None)
    }

    fn create_opponent_initiated(
        &mut self,
        message: &Message<D::Performative, D::Content>,
        dialogue_reference: DialogueReference,
    ) -> DialogueLabel {
        assert!(
            dialogue_reference.is_incomplete(),
            "cannot initiate a dialogue with a preassigned responder reference"
        );
        let dialogue_opponent_addr = message
            .sender()
            .expect("checked by is_message_by_self in update")
            .clone();
        let incomplete_label = DialogueLabel::new(
            dialogue_reference.clone(),
            dialogue_opponent_addr.clone(),
            dialogue_opponent_addr.clone(),
        );
        let complete_reference =
            dialogue_reference.with_responder(generate_dialogue_nonce().to_string());
        let complete_label = DialogueLabel::new(
            complete_reference,
            dialogue_opponent_addr.clone(),
            dialogue_opponent_addr,
        );

        let role = self
            .protocol
            .role_from_first_message(message, &self.agent_address);
        self.insert_new(incomplete_label, role, Some(complete_label))
    }

    fn insert_new(
        &mut self,
        incomplete_label: DialogueLabel,
        role: D::Role,
        complete_label: Option<DialogueLabel>,
    ) -> DialogueLabel {
        assert!(
            !self.incomplete_to_complete.contains_key(&incomplete_label),
            "incomplete dialogue label already present"
        );
        let label = match complete_label {
            Some(complete) => {
                self.incomplete_to_complete.insert(incomplete_label, complete.clone());
                complete
            }
            None => incomplete_label,
        };
        assert!(
            !self.by_label.contains_key(&label),
            "dialogue label already present in dialogues"
        );
        let dialogue = Dialogue::new(label.clone(), self.agent_address.clone(), role, Arc::clone(&self.protocol));
        self.by_label.insert(label.clone(), dialogue);
        label
    }
}
