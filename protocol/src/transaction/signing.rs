//! Signed transactions: a proposal plus the signatures collected so far.
//!
//! Every signature covers [`TransactionProposal::canonical_bytes`] and
//! nothing else. Because the proposal is immutable, a signature collected
//! from one party stays valid no matter how many more are added after it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::builder::TransactionProposal;
use super::verification::SignatureSetError;
use crate::crypto::hash::SecureHash;
use crate::crypto::keys::{PartyKeypair, PartyPublicKey, PartySignature};

/// A proposal together with a signer → signature map.
///
/// The map is a `BTreeMap` so that iteration, serialization and debug output
/// come out in the same order on every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    proposal: TransactionProposal,
    signatures: BTreeMap<PartyPublicKey, PartySignature>,
}

impl SignedTransaction {
    /// Wrap a proposal with no signatures yet.
    pub fn new(proposal: TransactionProposal) -> Self {
        Self {
            proposal,
            signatures: BTreeMap::new(),
        }
    }

    /// Wrap a proposal and sign it with `keypair` in one go.
    pub fn sign_with(proposal: TransactionProposal, keypair: &PartyKeypair) -> Self {
        let mut signed = Self::new(proposal);
        let sig = keypair.sign(&signed.proposal.canonical_bytes());
        signed.signatures.insert(keypair.public_key(), sig);
        signed
    }

    pub fn proposal(&self) -> &TransactionProposal {
        &self.proposal
    }

    pub fn id(&self) -> SecureHash {
        self.proposal.id()
    }

    pub fn signatures(&self) -> &BTreeMap<PartyPublicKey, PartySignature> {
        &self.signatures
    }

    pub fn signers(&self) -> BTreeSet<PartyPublicKey> {
        self.signatures.keys().cloned().collect()
    }

    /// Adds a signature after checking it against the canonical bytes.
    ///
    /// An invalid signature is refused and leaves the transaction untouched.
    /// Re-adding a valid signature for the same key replaces the old one.
    pub fn add_signature(
        &mut self,
        signer: PartyPublicKey,
        signature: PartySignature,
    ) -> Result<(), SignatureSetError> {
        if !signer.verify(&self.proposal.canonical_bytes(), &signature) {
            return Err(SignatureSetError::InvalidSignature { signer });
        }
        self.signatures.insert(signer, signature);
        Ok(())
    }

    /// Required signers that have not signed yet.
    pub fn missing_signers(&self) -> BTreeSet<PartyPublicKey> {
        self.proposal
            .required_signers()
            .into_iter()
            .filter(|k| !self.signatures.contains_key(k))
            .collect()
    }

    /// `true` when the signer set exactly equals the required set. Does not
    /// re-check signature validity; use
    /// [`verify_required_signatures`](Self::verify_required_signatures) for that.
    pub fn is_fully_signed(&self) -> bool {
        self.signers() == self.proposal.required_signers()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Party;
    use crate::state::{LedgerState, StateData, TemplateState};
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::{Command, CommandKind};

    fn two_party_proposal(a: &PartyKeypair, b: &PartyKeypair) -> TransactionProposal {
        let pa = Party::new("O=A", a.public_key());
        let pb = Party::new("O=B", b.public_key());
        TransactionBuilder::new()
            .notary(Party::new("O=Notary", PartyKeypair::from_seed(&[9u8; 32]).public_key()))
            .add_output_state(LedgerState::issue(
                StateData::Template(TemplateState {
                    owner: pa.clone(),
                    message: "hi".into(),
                }),
                None,
            ))
            .add_command(Command::for_parties(CommandKind::Issue, [&pa, &pb]))
            .build()
            .unwrap()
    }

    #[test]
    fn sign_with_adds_one_signature() {
        let a = PartyKeypair::from_seed(&[1u8; 32]);
        let b = PartyKeypair::from_seed(&[2u8; 32]);
        let signed = SignedTransaction::sign_with(two_party_proposal(&a, &b), &a);

        assert_eq!(signed.signatures().len(), 1);
        assert_eq!(
            signed.missing_signers().into_iter().collect::<Vec<_>>(),
            vec![b.public_key()]
        );
        assert!(!signed.is_fully_signed());
    }

    #[test]
    fn add_signature_rejects_a_bad_signature() {
        let a = PartyKeypair::from_seed(&[1u8; 32]);
        let b = PartyKeypair::from_seed(&[2u8; 32]);
        let mut signed = SignedTransaction::sign_with(two_party_proposal(&a, &b), &a);

        let bogus = b.sign(b"something else entirely");
        let err = signed.add_signature(b.public_key(), bogus).unwrap_err();
        assert_eq!(err, SignatureSetError::InvalidSignature { signer: b.public_key() });
        assert_eq!(signed.signatures().len(), 1);
    }

    #[test]
    fn signing_does_not_change_the_id() {
        let a = PartyKeypair::from_seed(&[1u8; 32]);
        let b = PartyKeypair::from_seed(&[2u8; 32]);
        let proposal = two_party_proposal(&a, &b);
        let id = proposal.id();

        let mut signed = SignedTransaction::sign_with(proposal, &a);
        let sig = b.sign(&signed.proposal().canonical_bytes());
        signed.add_signature(b.public_key(), sig).unwrap();

        assert_eq!(signed.id(), id);
        assert!(signed.is_fully_signed());
    }
}
