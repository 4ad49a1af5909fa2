//! Domain types for the dialogue core
//!
//! Strongly-typed values to prevent primitive obsession in the dialogue
//! label/message plumbing. The dialogue-reference sentinel (`""`) is
//! deliberately left as a plain `String`/`&str` rather than hidden behind a
//! validated newtype, since the empty string is a load-bearing value, not
//! an invalid one.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Opaque string identifying an agent endpoint.
#[nutype(
    validate(len_char_min = 1),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        AsRef,
        Borrow,
        TryFrom,
        Into
    )
)]
pub struct Address(String);

/// Monotonically assigned identifier of a message within a dialogue.
///
/// Starts at 1 (`Dialogue::STARTING_MESSAGE_ID`); every subsequent message
/// in the dialogue must carry `last_message_id + 1`.
#[nutype(
    validate(greater_or_equal = 1),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        Display,
        TryFrom,
        Into
    )
)]
pub struct MessageId(u64);

impl MessageId {
    /// The id of the first message in any dialogue.
    #[must_use]
    pub fn starting() -> Self {
        Self::try_new(1).expect("1 satisfies MessageId's >= 1 constraint")
    }

    /// The id of the message replying to this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self::try_new(self.into_inner() + 1).unwrap_or(self)
    }
}

/// The message id a reply targets; `0` denotes "targets nothing" (the
/// initial message of a dialogue).
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    Default,
    From,
    Into
))]
pub struct Target(u64);

impl Target {
    /// The target of the first message in any dialogue.
    #[must_use]
    pub fn starting() -> Self {
        Self::new(0)
    }

    /// Build a target pointing at the given message id.
    #[must_use]
    pub fn of(message_id: MessageId) -> Self {
        Self::new(message_id.into_inner())
    }

    /// Whether this target refers to the given message id.
    #[must_use]
    pub fn targets(self, message_id: MessageId) -> bool {
        self.into_inner() == message_id.into_inner()
    }
}

/// A dialogue nonce: 32 bytes of OS-entropy randomness, hex-encoded.
///
/// Used as the starter (or responder) half of a [`crate::label::DialogueReference`].
/// Never the sentinel empty string.
#[nutype(
    validate(predicate = |nonce: &str| nonce.len() == 64 && nonce.chars().all(|c| c.is_ascii_hexdigit())),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRef, Into)
)]
pub struct Nonce(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_rejects_zero() {
        assert!(MessageId::try_new(0).is_err());
    }

    #[test]
    fn message_id_next_increments() {
        assert_eq!(MessageId::starting().next().into_inner(), 2);
    }

    #[test]
    fn target_of_message_id_round_trips() {
        let id = MessageId::try_new(7).unwrap();
        assert!(Target::of(id).targets(id));
    }

    #[test]
    fn address_rejects_empty() {
        assert!(Address::try_new(String::new()).is_err());
    }

    #[test]
    fn nonce_rejects_wrong_length() {
        assert!(Nonce::try_new("deadbeef".to_string()).is_err());
    }
}
