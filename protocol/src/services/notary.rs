//! # Notary Client Interface
//!
//! The notary is the ordering and uniqueness service: the one place where
//! "has this state already been spent?" gets a definitive answer. Flows
//! talk to it through [`NotaryService`] and nothing else.
//!
//! ## In-Memory Notary
//!
//! [`InMemoryNotary`] is a single-process stand-in for development and
//! tests. It is not a consensus service. Its one job is to be the
//! serialization point the protocol assumes:
//!
//! - one mutex guards the consumed-input map, so two submissions touching
//!   the same input are checked and committed strictly one after the other;
//! - it checks the full signature set before locking anything, so a
//!   partially signed transaction cannot burn an input;
//! - resubmitting an already notarised transaction returns the original
//!   attestation instead of a double-spend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::crypto::hash::SecureHash;
use crate::crypto::keys::PartyKeypair;
use crate::identity::Party;
use crate::state::StateRef;
use crate::transaction::{NotaryAttestation, SignedTransaction};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A consumed input and the transaction that consumed it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateRef,
    pub consumed_by: SecureHash,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotaryError {
    /// At least one input was already spent. Never retry with these inputs.
    #[error("double spend: {} input(s) already consumed", conflicts.len())]
    DoubleSpend { conflicts: Vec<Conflict> },

    /// The notary could not be reached or refused service. Retryable.
    #[error("notary unavailable: {0}")]
    Unavailable(String),

    /// The request itself is bad (wrong notary, unsigned, ...).
    #[error("invalid notarisation request: {0}")]
    InvalidRequest(String),
}

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

/// What the notary gets: the fully signed transaction. The notary reads the
/// inputs to lock from the proposal itself.
#[derive(Debug, Clone)]
pub struct NotarisationRequest {
    pub transaction: SignedTransaction,
}

#[async_trait]
pub trait NotaryService: Send + Sync {
    /// The identity attestations will be signed by.
    fn identity(&self) -> &Party;

    /// Atomically check-and-lock the transaction's inputs.
    async fn submit(&self, request: NotarisationRequest)
        -> Result<NotaryAttestation, NotaryError>;
}

// ---------------------------------------------------------------------------
// InMemoryNotary
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Ledger {
    /// input → transaction that consumed it
    consumed: HashMap<StateRef, SecureHash>,
    /// notarised txid → attestation, for idempotent resubmission
    attested: HashMap<SecureHash, NotaryAttestation>,
    sequence: u64,
}

/// Single-process notary for development and tests.
pub struct InMemoryNotary {
    identity: Party,
    keypair: PartyKeypair,
    ledger: Mutex<Ledger>,
    unavailable: AtomicBool,
}

impl InMemoryNotary {
    pub fn new(name: impl Into<String>, keypair: PartyKeypair) -> Self {
        let identity = Party::new(name, keypair.public_key());
        Self {
            identity,
            keypair,
            ledger: Mutex::new(Ledger::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage. While set, every submit returns `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn is_consumed(&self, state: &StateRef) -> bool {
        self.ledger.lock().consumed.contains_key(state)
    }

    /// Number of transactions notarised so far.
    pub fn notarised_count(&self) -> u64 {
        self.ledger.lock().sequence
    }

    fn check_request(&self, tx: &SignedTransaction) -> Result<(), NotaryError> {
        if tx.proposal().notary().owning_key != self.identity.owning_key {
            return Err(NotaryError::InvalidRequest(format!(
                "transaction names notary {}, this is {}",
                tx.proposal().notary(),
                self.identity
            )));
        }
        tx.verify_required_signatures()
            .map_err(|e| NotaryError::InvalidRequest(e.to_string()))
    }
}

/// Milliseconds since the Unix epoch. A clock set before 1970 reads as 0.
fn unix_millis(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp_millis()).unwrap_or(0)
}

#[async_trait]
impl NotaryService for InMemoryNotary {
    fn identity(&self) -> &Party {
        &self.identity
    }

    async fn submit(
        &self,
        request: NotarisationRequest,
    ) -> Result<NotaryAttestation, NotaryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NotaryError::Unavailable(format!(
                "{} is not accepting requests",
                self.identity
            )));
        }

        let tx = request.transaction;
        self.check_request(&tx)?;
        let txid = tx.id();
        let inputs = tx.proposal().input_refs();

        let mut ledger = self.ledger.lock();

        if let Some(existing) = ledger.attested.get(&txid) {
            info!(txid = %txid, "already notarised, returning original attestation");
            return Ok(existing.clone());
        }

        let conflicts: Vec<Conflict> = inputs
            .iter()
            .filter_map(|r| {
                ledger.consumed.get(r).map(|by| Conflict {
                    state: *r,
                    consumed_by: *by,
                })
            })
            .collect();
        if !conflicts.is_empty() {
            warn!(txid = %txid, conflicts = conflicts.len(), "double spend rejected");
            return Err(NotaryError::DoubleSpend { conflicts });
        }

        for r in &inputs {
            ledger.consumed.insert(*r, txid);
        }
        ledger.sequence += 1;
        let attestation = NotaryAttestation::sign(
            &self.keypair,
            self.identity.clone(),
            txid,
            ledger.sequence,
            inputs,
            unix_millis(Utc::now()),
        );
        ledger.attested.insert(txid, attestation.clone());

        info!(txid = %txid, sequence = ledger.sequence, "notarised");
        Ok(attestation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
