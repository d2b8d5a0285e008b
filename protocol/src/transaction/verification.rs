//! Signature-set verification for signed transactions.
//!
//! A transaction is fully signed when its signer set is *exactly* the
//! required set and every signature verifies over the canonical bytes. The
//! checks run cheapest first: set arithmetic before any Ed25519 work.
//!
//! Contract rules are a separate concern, see [`crate::contract`].

use std::collections::BTreeSet;
use thiserror::Error;

use super::signing::SignedTransaction;
use crate::crypto::keys::PartyPublicKey;
use crate::crypto::signatures::{batch_verify, SignatureError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Ways a signature set can fail to match its proposal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureSetError {
    /// Required signers with no signature.
    #[error("missing signatures from {} required signer(s)", missing.len())]
    MissingSignatures { missing: Vec<PartyPublicKey> },

    /// Signatures from keys the proposal never asked for.
    #[error("{} unexpected signer(s) present", unexpected.len())]
    UnexpectedSigners { unexpected: Vec<PartyPublicKey> },

    /// A signature that does not verify over the canonical bytes.
    #[error("invalid signature from {signer}")]
    InvalidSignature { signer: PartyPublicKey },
}

impl From<SignatureError> for SignatureSetError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::VerificationFailed(signer) => Self::InvalidSignature { signer },
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

impl SignedTransaction {
    /// Full check: signer set equals the required set, all signatures valid.
    pub fn verify_required_signatures(&self) -> Result<(), SignatureSetError> {
        self.verify_signatures_except(&BTreeSet::new())
    }

    /// Like [`verify_required_signatures`](Self::verify_required_signatures)
    /// but tolerates `allowed_missing` being absent. Counterparties use this
    /// on an in-flight proposal, where their own signature (and others not
    /// yet collected) is legitimately absent.
    ///
    /// Extra signers are never tolerated.
    pub fn verify_signatures_except(
        &self,
        allowed_missing: &BTreeSet<PartyPublicKey>,
    ) -> Result<(), SignatureSetError> {
        let required = self.proposal().required_signers();
        let present = self.signers();

        let unexpected: Vec<PartyPublicKey> = present.difference(&required).cloned().collect();
        if !unexpected.is_empty() {
            return Err(SignatureSetError::UnexpectedSigners { unexpected });
        }

        let missing: Vec<PartyPublicKey> = required
            .difference(&present)
            .filter(|k| !allowed_missing.contains(*k))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SignatureSetError::MissingSignatures { missing });
        }

        let payload = self.proposal().canonical_bytes();
        batch_verify(&payload, self.signatures().iter())?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
