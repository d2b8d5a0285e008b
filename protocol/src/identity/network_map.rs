//! # Network Map
//!
//! The set of identities a node knows about: ordinary parties it may open
//! sessions with, and the notaries it may submit transactions to.
//!
//! The map is handed to flows explicitly through
//! [`FlowContext`](crate::flows::FlowContext). There is no process-wide
//! registry to consult; two nodes in the same process can hold different
//! views of the network, which is exactly what the integration tests do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::party::Party;
use crate::crypto::keys::PartyPublicKey;

/// Lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no party known for key {0}")]
    UnknownKey(String),

    #[error("no party known by name '{0}'")]
    UnknownName(String),

    #[error("the network map lists no notary")]
    NoNotary,
}

/// Known parties and notaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMap {
    parties: Vec<Party>,
    notaries: Vec<Party>,
}

impl NetworkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party. Re-registering the same key replaces the entry.
    pub fn add_party(&mut self, party: Party) -> &mut Self {
        self.parties.retain(|p| p.owning_key != party.owning_key);
        self.parties.push(party);
        self
    }

    /// Register a notary. Notaries are kept in registration order; the
    /// first one is the default.
    pub fn add_notary(&mut self, notary: Party) -> &mut Self {
        self.notaries.retain(|p| p.owning_key != notary.owning_key);
        self.notaries.push(notary);
        self
    }

    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    pub fn notaries(&self) -> &[Party] {
        &self.notaries
    }

    /// The notary to use when the caller does not pick one.
    pub fn default_notary(&self) -> Result<&Party, IdentityError> {
        self.notaries.first().ok_or(IdentityError::NoNotary)
    }

    /// Resolve a signing key to a party we can open a session with.
    pub fn party_for_key(&self, key: &PartyPublicKey) -> Result<&Party, IdentityError> {
        self.parties
            .iter()
            .find(|p| &p.owning_key == key)
            .ok_or_else(|| IdentityError::UnknownKey(key.to_hex()))
    }

    pub fn party_by_name(&self, name: &str) -> Result<&Party, IdentityError> {
        self.parties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| IdentityError::UnknownName(name.to_string()))
    }

    pub fn is_notary(&self, key: &PartyPublicKey) -> bool {
        self.notaries.iter().any(|n| &n.owning_key == key)
    }
}
