//! A small fixture protocol used only by this crate's integration tests: a
//! two-party negotiation with proposal, acceptance, and rejection
//! performatives.

use dialogue_core::{Address, DialogueMessage, Message, ProtocolDescriptor};
use std::collections::HashSet;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Performative {
    Propose,
    Accept,
    Reject,
    Inform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndState {
    Successful,
    Declined,
}

pub type FixtureMessage = Message<Performative, String>;

static INITIAL: LazyLock<HashSet<Performative>> =
    LazyLock::new(|| HashSet::from([Performative::Propose]));
static TERMINAL: LazyLock<HashSet<Performative>> =
    LazyLock::new(|| HashSet::from([Performative::Reject, Performative::Inform]));

pub struct NegotiationProtocol;

impl ProtocolDescriptor for NegotiationProtocol {
    type Performative = Performative;
    type Role = Role;
    type EndState = EndState;
    type Content = String;

    fn initial_performatives(&self) -> &HashSet<Self::Performative> {
        &INITIAL
    }

    fn terminal_performatives(&self) -> &HashSet<Self::Performative> {
        &TERMINAL
    }

    fn valid_replies(
        &self,
        performative: &Self::Performative,
    ) -> Option<&HashSet<Self::Performative>> {
        static PROPOSE: LazyLock<HashSet<Performative>> = LazyLock::new(|| {
            HashSet::from([Performative::Propose, Performative::Accept, Performative::Reject])
        });
        static ACCEPT: LazyLock<HashSet<Performative>> =
            LazyLock::new(|| HashSet::from([Performative::Inform]));
        static EMPTY: LazyLock<HashSet<Performative>> = LazyLock::new(HashSet::new);

        match performative {
            Performative::Propose => Some(&PROPOSE),
            Performative::Accept => Some(&ACCEPT),
            Performative::Reject | Performative::Inform => Some(&EMPTY),
        }
    }

    fn role_from_first_message(&self, message: &FixtureMessage, receiver_address: &Address) -> Self::Role {
        let is_self = message
            .sender()
            .map(|sender| sender == receiver_address)
            .unwrap_or(false);
        if is_self { Role::Initiator } else { Role::Responder }
    }

    fn is_valid(
        &self,
        _dialogue: &dialogue_core::Dialogue<Self>,
        message: &FixtureMessage,
    ) -> Result<(), String> {
        if message.content.is_empty() {
            return Err("fixture messages must carry non-empty content".to_string());
        }
        Ok(())
    }
}

/// The declared end states, for constructing a `Dialogues` registry.
pub fn end_states() -> HashSet<EndState> {
    HashSet::from([EndState::Successful, EndState::Declined])
}
