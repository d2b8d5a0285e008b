//! Signing service: the only thing in a node that touches secret keys.
//!
//! Flows never hold a [`PartyKeypair`]. They ask the signing service to sign
//! bytes for a public key, so a node can swap the in-memory [`KeyStore`]
//! for an HSM-backed implementation without touching protocol code.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use crate::crypto::keys::{PartyKeypair, PartyPublicKey, PartySignature};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// We hold no secret for this key.
    #[error("no signing key held for {0}")]
    UnknownKey(String),
}

#[async_trait]
pub trait SigningService: Send + Sync {
    /// Sign `payload` with the secret behind `key`.
    async fn sign(
        &self,
        key: &PartyPublicKey,
        payload: &[u8],
    ) -> Result<PartySignature, SigningError>;

    /// Check a signature. Pure; no key material needed.
    fn verify_signature(
        &self,
        key: &PartyPublicKey,
        payload: &[u8],
        signature: &PartySignature,
    ) -> bool {
        key.verify(payload, signature)
    }
}

/// In-memory key store.
#[derive(Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<PartyPublicKey, PartyKeypair>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with a single key already loaded.
    pub fn with_key(keypair: PartyKeypair) -> Self {
        let store = Self::new();
        store.insert(keypair);
        store
    }

    /// Add a keypair; returns its public key.
    pub fn insert(&self, keypair: PartyKeypair) -> PartyPublicKey {
        let public = keypair.public_key();
        self.keys.write().insert(public.clone(), keypair);
        public
    }

    pub fn contains(&self, key: &PartyPublicKey) -> bool {
        self.keys.read().contains_key(key)
    }
}

#[async_trait]
impl SigningService for KeyStore {
    async fn sign(
        &self,
        key: &PartyPublicKey,
        payload: &[u8],
    ) -> Result<PartySignature, SigningError> {
        let keys = self.keys.read();
        let keypair = keys
            .get(key)
            .ok_or_else(|| SigningError::UnknownKey(key.to_hex()))?;
        Ok(keypair.sign(payload))
    }
}
