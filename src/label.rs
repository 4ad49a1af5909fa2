//! Dialogue reference and dialogue label identity.

use crate::domain_types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The sentinel value denoting an unassigned half of a [`DialogueReference`].
/// Reserved; must never be generated by the nonce source.
pub const UNASSIGNED_DIALOGUE_REFERENCE: &str = "";

/// A `(starter_ref, responder_ref)` pair identifying one half of a
/// conversation's correlation id.
///
/// Exactly one of the two may be [`UNASSIGNED_DIALOGUE_REFERENCE`] while the
/// other is set (the *incomplete* state). Both set is *complete*. Both
/// unassigned is not a valid reference and is rejected by the registry
/// before it ever becomes a [`DialogueReference`] (see
/// `Dialogues::update`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogueReference {
    starter: String,
    responder: String,
}

impl DialogueReference {
    /// Build a reference from its two halves.
    #[must_use]
    pub fn new(starter: impl Into<String>, responder: impl Into<String>) -> Self {
        Self {
            starter: starter.into(),
            responder: responder.into(),
        }
    }

    /// Build an incomplete self-initiated reference: `(starter, "")`.
    #[must_use]
    pub fn incomplete(starter: impl Into<String>) -> Self {
        Self::new(starter, UNASSIGNED_DIALOGUE_REFERENCE)
    }

    /// The starter half, chosen by the dialogue's initiator.
    #[must_use]
    pub fn starter_reference(&self) -> &str {
        &self.starter
    }

    /// The responder half, chosen by the responder on its first reply.
    #[must_use]
    pub fn responder_reference(&self) -> &str {
        &self.responder
    }

    /// `true` if the responder half has not yet been assigned.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.responder == UNASSIGNED_DIALOGUE_REFERENCE
    }

    /// `true` if both halves are assigned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.is_incomplete()
    }

    /// `true` if neither half is assigned (not a valid reference for any
    /// dialogue).
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.starter == UNASSIGNED_DIALOGUE_REFERENCE
            && self.responder == UNASSIGNED_DIALOGUE_REFERENCE
    }

    /// Replace the responder half, completing the reference.
    #[must_use]
    pub fn with_responder(&self, responder: impl Into<String>) -> Self {
        Self::new(self.starter.clone(), responder)
    }

    /// Get the incomplete version of this reference (responder half reset
    /// to the sentinel).
    #[must_use]
    pub fn as_incomplete(&self) -> Self {
        Self::incomplete(self.starter.clone())
    }
}

/// Quadruple `(reference, opponent_addr, starter_addr)`: the sole identity
/// of a conversation. Two labels are equal iff all four components are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogueLabel {
    dialogue_reference: DialogueReference,
    dialogue_opponent_addr: Address,
    dialogue_starter_addr: Address,
}

impl DialogueLabel {
    /// Build a dialogue label from its components.
    #[must_use]
    pub fn new(
        dialogue_reference: DialogueReference,
        dialogue_opponent_addr: Address,
        dialogue_starter_addr: Address,
    ) -> Self {
        Self {
            dialogue_reference,
            dialogue_opponent_addr,
            dialogue_starter_addr,
        }
    }

    /// The dialogue reference.
    #[must_use]
    pub fn dialogue_reference(&self) -> &DialogueReference {
        &self.dialogue_reference
    }

    /// The starter half of the reference.
    #[must_use]
    pub fn dialogue_starter_reference(&self) -> &str {
        self.dialogue_reference.starter_reference()
    }

    /// The responder half of the reference.
    #[must_use]
    pub fn dialogue_responder_reference(&self) -> &str {
        self.dialogue_reference.responder_reference()
    }

    /// The address of the peer in this conversation. Never the owning
    /// agent's own address.
    #[must_use]
    pub fn dialogue_opponent_addr(&self) -> &Address {
        &self.dialogue_opponent_addr
    }

    /// The address of whichever agent started this conversation (self or
    /// opponent).
    #[must_use]
    pub fn dialogue_starter_addr(&self) -> &Address {
        &self.dialogue_starter_addr
    }

    /// Get the incomplete version of this label: same opponent/starter
    /// addresses, responder reference reset to the sentinel.
    #[must_use]
    pub fn incomplete(&self) -> Self {
        Self::new(
            self.dialogue_reference.as_incomplete(),
            self.dialogue_opponent_addr.clone(),
            self.dialogue_starter_addr.clone(),
        )
    }
}

/// JSON representation of a [`DialogueLabel`], with the bit-exact field
/// names the core's external interface guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLabelJson {
    /// Starter half of the dialogue reference.
    pub dialogue_starter_reference: String,
    /// Responder half of the dialogue reference.
    pub dialogue_responder_reference: String,
    /// Opponent's address.
    pub dialogue_opponent_addr: String,
    /// Starter's address.
    pub dialogue_starter_addr: String,
}

impl From<&DialogueLabel> for DialogueLabelJson {
    fn from(label: &DialogueLabel) -> Self {
        Self {
            dialogue_starter_reference: label.dialogue_starter_reference().to_string(),
            dialogue_responder_reference: label.dialogue_responder_reference().to_string(),
            dialogue_opponent_addr: label.dialogue_opponent_addr().to_string(),
            dialogue_starter_addr: label.dialogue_starter_addr().to_string(),
        }
    }
}

/// Error parsing a [`DialogueLabel`] from its JSON or string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogueLabelParseError {
    /// The string form did not split into exactly four `_`-separated parts.
    #[error("expected 4 underscore-separated fields, found {found}")]
    WrongFieldCount {
        /// How many fields were actually found.
        found: usize,
    },
    /// One of the JSON/string fields failed address validation.
    #[error("invalid address field: {0}")]
    InvalidAddress(String),
}

impl TryFrom<DialogueLabelJson> for DialogueLabel {
    type Error = DialogueLabelParseError;

    fn try_from(json: DialogueLabelJson) -> Result<Self, Self::Error> {
        let opponent = Address::try_from(json.dialogue_opponent_addr)
            .map_err(|e| DialogueLabelParseError::InvalidAddress(e.to_string()))?;
        let starter = Address::try_from(json.dialogue_starter_addr)
            .map_err(|e| DialogueLabelParseError::InvalidAddress(e.to_string()))?;
        Ok(Self::new(
            DialogueReference::new(
                json.dialogue_starter_reference,
                json.dialogue_responder_reference,
            ),
            opponent,
            starter,
        ))
    }
}

impl fmt::Display for DialogueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.dialogue_starter_reference(),
            self.dialogue_responder_reference(),
            self.dialogue_opponent_addr(),
            self.dialogue_starter_addr()
        )
    }
}

impl FromStr for DialogueLabel {
    type Err = DialogueLabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 4 {
            return Err(DialogueLabelParseError::WrongFieldCount {
                found: parts.len(),
            });
        }
        let [starter_ref, responder_ref, opponent_addr, starter_addr] = [
            parts[0], parts[1], parts[2], parts[3],
        ];
        let opponent = Address::try_from(opponent_addr.to_string())
            .map_err(|e| DialogueLabelParseError::InvalidAddress(e.to_string()))?;
        let starter = Address::try_from(starter_addr.to_string())
            .map_err(|e| DialogueLabelParseError::InvalidAddress(e.to_string()))?;
        Ok(Self::new(
            DialogueReference::new(starter_ref, responder_ref),
            opponent,
            starter,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::try_from(s.to_string()).unwrap()
    }

    #[test]
    fn incomplete_reference_round_trips_to_complete() {
        let incomplete = DialogueReference::incomplete("n1");
        assert!(incomplete.is_incomplete());
        let complete = incomplete.with_responder("n2");
        assert!(complete.is_complete());
        assert_eq!(complete.as_incomplete(), incomplete);
    }

    #[test]
    fn both_unassigned_is_invalid() {
        let reference = DialogueReference::new("", "");
        assert!(reference.is_invalid());
    }

    #[test]
    fn string_round_trip() {
        let label = DialogueLabel::new(
            DialogueReference::new("n1", "n2"),
            addr("bob"),
            addr("alice"),
        );
        let s = label.to_string();
        assert_eq!(s, "n1_n2_bob_alice");
        let parsed: DialogueLabel = s.parse().unwrap();
        assert_eq!(parsed, label);
    }

    #[test]
    fn json_round_trip() {
        let label = DialogueLabel::new(
            DialogueReference::new("n1", "n2"),
            addr("bob"),
            addr("alice"),
        );
        let json = DialogueLabelJson::from(&label);
        let parsed = DialogueLabel::try_from(json).unwrap();
        assert_eq!(parsed, label);
    }

    #[test]
    fn incomplete_label_replaces_only_responder() {
        let label = DialogueLabel::new(
            DialogueReference::new("n1", "n2"),
            addr("bob"),
            addr("alice"),
        );
        let incomplete = label.incomplete();
        assert_eq!(incomplete.dialogue_starter_reference(), "n1");
        assert_eq!(incomplete.dialogue_responder_reference(), "");
        assert_eq!(incomplete.dialogue_opponent_addr(), label.dialogue_opponent_addr());
        assert_eq!(incomplete.dialogue_starter_addr(), label.dialogue_starter_addr());
    }
}
