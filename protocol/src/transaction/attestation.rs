//! # Notary Attestations & Finalized Transactions
//!
//! The last step of a transaction's life: the notary confirms that none of
//! its inputs were consumed before, locks them, and signs an attestation.
//! A [`SignedTransaction`] plus that attestation is a
//! [`FinalizedTransaction`], the terminal form every participant stores.
//!
//! ## Attestation Digest
//!
//! The notary does not sign the proposal bytes. It signs a BLAKE3
//! derive-key digest under [`ATTESTATION_DOMAIN`] of
//!
//! ```text
//! txid:[32] sequence:u64 consumed: len:u32 { txhash:[32] index:u32 }* timestamp_ms:u64 notary_key:[32]
//! ```
//!
//! so an attestation can never be confused with a party signature, even when
//! the notary key also signs for something else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::signing::SignedTransaction;
use super::verification::SignatureSetError;
use crate::config::ATTESTATION_DOMAIN;
use crate::crypto::hash::{domain_separated_hash, SecureHash};
use crate::crypto::keys::{PartyKeypair, PartySignature};
use crate::encoding::CanonicalWriter;
use crate::identity::Party;
use crate::state::StateRef;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("attestation is for {attested}, transaction is {actual}")]
    TransactionMismatch {
        attested: SecureHash,
        actual: SecureHash,
    },

    #[error("attestation signed by {found}, expected notary {expected}")]
    WrongNotary { expected: String, found: String },

    #[error("attestation consumes a different input set than the transaction")]
    ConsumedMismatch,

    #[error("notary signature does not verify")]
    BadSignature,

    #[error(transparent)]
    Signatures(#[from] SignatureSetError),
}

// ---------------------------------------------------------------------------
// NotaryAttestation
// ---------------------------------------------------------------------------

/// The notary's proof that a transaction was ordered and its inputs locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryAttestation {
    pub notary: Party,
    pub txid: SecureHash,
    /// Position in the notary's commit order. Strictly increasing per notary.
    pub sequence: u64,
    /// The input references that are now spent, in proposal order.
    pub consumed: Vec<StateRef>,
    pub timestamp_ms: u64,
    pub signature: PartySignature,
}

impl NotaryAttestation {
    /// Produce a signed attestation. Only notaries call this.
    pub fn sign(
        keypair: &PartyKeypair,
        notary: Party,
        txid: SecureHash,
        sequence: u64,
        consumed: Vec<StateRef>,
        timestamp_ms: u64,
    ) -> Self {
        let digest = attestation_digest(&notary, &txid, sequence, &consumed, timestamp_ms);
        let signature = keypair.sign(&digest);
        Self {
            notary,
            txid,
            sequence,
            consumed,
            timestamp_ms,
            signature,
        }
    }

    pub fn digest(&self) -> [u8; 32] {
        attestation_digest(
            &self.notary,
            &self.txid,
            self.sequence,
            &self.consumed,
            self.timestamp_ms,
        )
    }

    /// Check the notary's signature against its own embedded key.
    pub fn verify_signature(&self) -> bool {
        self.notary.owning_key.verify(&self.digest(), &self.signature)
    }
}

fn attestation_digest(
    notary: &Party,
    txid: &SecureHash,
    sequence: u64,
    consumed: &[StateRef],
    timestamp_ms: u64,
) -> [u8; 32] {
    let mut w = CanonicalWriter::with_capacity(128);
    w.put_fixed(txid.as_bytes())
        .put_u64(sequence)
        .put_len(consumed.len());
    for r in consumed {
        w.put_fixed(r.txhash.as_bytes()).put_u32(r.index);
    }
    w.put_u64(timestamp_ms)
        .put_fixed(notary.owning_key.as_bytes());
    domain_separated_hash(ATTESTATION_DOMAIN, &w.finish())
}

// ---------------------------------------------------------------------------
// FinalizedTransaction
// ---------------------------------------------------------------------------

/// A fully signed transaction plus the notary's attestation. Terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    pub signed: SignedTransaction,
    pub attestation: NotaryAttestation,
}

impl FinalizedTransaction {
    pub fn new(signed: SignedTransaction, attestation: NotaryAttestation) -> Self {
        Self {
            signed,
            attestation,
        }
    }

    pub fn id(&self) -> SecureHash {
        self.signed.id()
    }

    /// Everything a receiving participant must check before storing:
    ///
    /// 1. the attestation names this transaction,
    /// 2. it comes from the notary the proposal designated (and `expected`),
    /// 3. it consumes exactly the proposal's inputs,
    /// 4. the notary signature verifies,
    /// 5. the party signature set is complete and valid.
    pub fn verify(&self, expected: &Party) -> Result<(), AttestationError> {
        let actual = self.signed.id();
        if self.attestation.txid != actual {
            return Err(AttestationError::TransactionMismatch {
                attested: self.attestation.txid,
                actual,
            });
        }

        let designated = self.signed.proposal().notary();
        for want in [expected, designated] {
            if self.attestation.notary.owning_key != want.owning_key {
                return Err(AttestationError::WrongNotary {
                    expected: want.name.clone(),
                    found: self.attestation.notary.name.clone(),
                });
            }
        }

        if self.attestation.consumed != self.signed.proposal().input_refs() {
            return Err(AttestationError::ConsumedMismatch);
        }

        if !self.attestation.verify_signature() {
            return Err(AttestationError::BadSignature);
        }

        self.signed.verify_required_signatures()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::double_sha256;
    use crate::state::{LedgerState, StateAndRef, StateData, TemplateState};
    use crate::transaction::builder::TransactionBuilder;
    use crate::transaction::types::{Command, CommandKind};

    struct Fixture {
        notary_kp: PartyKeypair,
        notary: Party,
        signed: SignedTransaction,
    }

    fn fixture() -> Fixture {
        let owner = PartyKeypair::from_seed(&[1u8; 32]);
        let notary_kp = PartyKeypair::from_seed(&[9u8; 32]);
        let notary = Party::new("O=Notary", notary_kp.public_key());
        let party = Party::new("O=Owner", owner.public_key());
        let prior = LedgerState::issue(
            StateData::Template(TemplateState {
                owner: party.clone(),
                message: "old".into(),
            }),
            None,
        );
        let input = StateAndRef::new(prior.clone(), StateRef::new(double_sha256(b"prior"), 0));
        let proposal = TransactionBuilder::new()
            .notary(notary.clone())
            .add_input_state(input)
            .add_output_state(prior.successor(StateData::Template(TemplateState {
                owner: party.clone(),
                message: "new".into(),
            })))
            .add_command(Command::for_parties(CommandKind::Change, [&party]))
            .build()
            .unwrap();
        let signed = SignedTransaction::sign_with(proposal, &owner);
        Fixture {
            notary_kp,
            notary,
            signed,
        }
    }

    fn attest(f: &Fixture) -> NotaryAttestation {
        NotaryAttestation::sign(
            &f.notary_kp,
            f.notary.clone(),
            f.signed.id(),
            1,
            f.signed.proposal().input_refs(),
            1_700_000_000_000,
        )
    }

    #[test]
    fn a_good_attestation_verifies() {
        let f = fixture();
        let finalized = FinalizedTransaction::new(f.signed.clone(), attest(&f));
        assert!(finalized.verify(&f.notary).is_ok());
    }

    #[test]
    fn wrong_txid_is_caught() {
        let f = fixture();
        let mut att = attest(&f);
        att.txid = double_sha256(b"other");
        let finalized = FinalizedTransaction::new(f.signed.clone(), att);
        assert!(matches!(
            finalized.verify(&f.notary),
            Err(AttestationError::TransactionMismatch { .. })
        ));
    }

    #[test]
    fn tampered_sequence_breaks_the_signature() {
        let f = fixture();
        let mut att = attest(&f);
        att.sequence = 2;
        let finalized = FinalizedTransaction::new(f.signed.clone(), att);
        assert_eq!(finalized.verify(&f.notary), Err(AttestationError::BadSignature));
    }

    #[test]
    fn an_impostor_notary_is_refused() {
        let f = fixture();
        let impostor_kp = PartyKeypair::from_seed(&[66u8; 32]);
        let impostor = Party::new("O=Notary", impostor_kp.public_key());
        let att = NotaryAttestation::sign(
            &impostor_kp,
            impostor,
            f.signed.id(),
            1,
            f.signed.proposal().input_refs(),
            0,
        );
        let finalized = FinalizedTransaction::new(f.signed.clone(), att);
        assert!(matches!(
            finalized.verify(&f.notary),
            Err(AttestationError::WrongNotary { .. })
        ));
    }

    #[test]
    fn attestation_digest_is_not_the_proposal_payload() {
        let f = fixture();
        let att = attest(&f);
        assert!(!f
            .notary
            .owning_key
            .verify(&f.signed.proposal().canonical_bytes(), &att.signature));
    }
}
