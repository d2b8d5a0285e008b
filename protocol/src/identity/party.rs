//! # Parties
//!
//! A [`Party`] is a well-known identity: a legal name bound to the Ed25519
//! key that signs on its behalf. States list parties as participants,
//! commands list the keys they need, and sessions are opened to parties.
//!
//! Equality and ordering look at the key first. Two parties with the same
//! key and different names are different records, but sorting by key keeps
//! participant encodings stable no matter how names are spelled.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::keys::PartyPublicKey;

/// A named, key-bound participant.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Party {
    /// The key that signs for this party. Field order matters: derived `Ord`
    /// compares this first.
    pub owning_key: PartyPublicKey,
    /// Legal name, e.g. `O=Northwind Bank,L=London,C=GB`.
    pub name: String,
}

impl Party {
    pub fn new(name: impl Into<String>, owning_key: PartyPublicKey) -> Self {
        Self {
            owning_key,
            name: name.into(),
        }
    }

    /// Canonical byte form: length-prefixed name followed by the raw key.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(36 + self.name.len());
        buf.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(self.owning_key.as_bytes());
        buf
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Party({} @ {})", self.name, self.owning_key.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PartyKeypair;

    #[test]
    fn canonical_bytes_bind_name_and_key() {
        let kp = PartyKeypair::from_seed(&[1u8; 32]);
        let a = Party::new("O=Bank", kp.public_key());
        let b = Party::new("O=Dealer", kp.public_key());
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
        assert!(a.canonical_bytes().ends_with(kp.public_key().as_bytes()));
    }

    #[test]
    fn display_is_the_name() {
        let party = Party::new("O=Bank", PartyKeypair::generate().public_key());
        assert_eq!(party.to_string(), "O=Bank");
    }
}
