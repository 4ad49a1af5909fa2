//! Cryptographically strong nonce generation for self-initiated dialogue
//! references.

use crate::domain_types::Nonce;
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes of entropy per nonce (hex-encoded to 64 chars).
pub const NONCE_BYTES: usize = 32;

/// Generate a nonce from an OS-entropy-seeded RNG: 32 random bytes,
/// hex-encoded. Collisions are treated as impossible; no reuse is
/// attempted.
#[must_use]
pub fn generate_dialogue_nonce() -> Nonce {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let hex = bytes.iter().map(|b| format!("{b:02x}")).collect::<String>();
    Nonce::try_new(hex).expect("32 random bytes hex-encode to exactly 64 hex characters")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn nonces_are_well_formed() {
        let nonce = generate_dialogue_nonce();
        assert_eq!(nonce.as_ref().len(), 64);
    }

    #[test]
    fn nonces_are_unique_across_many_calls() {
        let nonces: HashSet<Nonce> = (0..10_000).map(|_| generate_dialogue_nonce()).collect();
        assert_eq!(nonces.len(), 10_000);
    }

    #[test]
    fn nonce_never_collides_with_the_sentinel() {
        let nonce = generate_dialogue_nonce();
        assert_ne!(nonce.as_ref(), crate::label::UNASSIGNED_DIALOGUE_REFERENCE);
    }
}
