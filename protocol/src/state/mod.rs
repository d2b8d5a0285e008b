//! # State Model
//!
//! A [`LedgerState`] is an immutable fact on the shared ledger. It is created
//! as an output of an accepted transaction and consumed, at most once, as the
//! input of a later one. "Changing" a state means consuming it and producing
//! a successor that carries the same [`UniqueIdentifier`].
//!
//! ```text
//!   tx A: [] ──Issue──► car#1 (linear_id L)
//!   tx B: [car#1] ──Change──► car#2 (linear_id L)     car#1 is now spent
//! ```
//!
//! Outputs of a finalized transaction are named by [`StateRef`]
//! (transaction id + output index). That reference is what the notary locks
//! and what a vault reports as unspent.

pub mod car;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::crypto::hash::SecureHash;
use crate::encoding::CanonicalWriter;
use crate::identity::Party;

pub use car::CarState;

// ---------------------------------------------------------------------------
// UniqueIdentifier
// ---------------------------------------------------------------------------

/// Linear identity of a state lineage. Created once at issuance, copied
/// verbatim into every successor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueIdentifier {
    /// Optional business key (e.g. the VIN), for humans.
    pub external_id: Option<String>,
    pub id: Uuid,
}

impl UniqueIdentifier {
    pub fn new(external_id: Option<String>) -> Self {
        Self {
            external_id,
            id: Uuid::new_v4(),
        }
    }

    fn write_canonical(&self, w: &mut CanonicalWriter) {
        w.put_opt_str(self.external_id.as_deref())
            .put_fixed(self.id.as_bytes());
    }
}

impl Default for UniqueIdentifier {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Display for UniqueIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.external_id {
            Some(ext) => write!(f, "{}_{}", ext, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

// ---------------------------------------------------------------------------
// StateRef
// ---------------------------------------------------------------------------

/// Pointer to output `index` of the finalized transaction `txhash`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    pub txhash: SecureHash,
    pub index: u32,
}

impl StateRef {
    pub fn new(txhash: SecureHash, index: u32) -> Self {
        Self { txhash, index }
    }

    /// Fixed-width key: 32 hash bytes then the big-endian index, so a sled
    /// prefix scan over one transaction's outputs comes back in index order.
    pub fn to_key_bytes(&self) -> [u8; 36] {
        let mut key = [0u8; 36];
        key[..32].copy_from_slice(self.txhash.as_bytes());
        key[32..].copy_from_slice(&self.index.to_be_bytes());
        key
    }

    fn write_canonical(&self, w: &mut CanonicalWriter) {
        w.put_fixed(self.txhash.as_bytes()).put_u32(self.index);
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

impl fmt::Debug for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateRef({}..:{})", &self.txhash.to_hex()[..12], self.index)
    }
}

// ---------------------------------------------------------------------------
// StateData
// ---------------------------------------------------------------------------

/// A free-form record owned by a single party. Not issuable through the car
/// rules; it exists so the ledger can hold more than one kind of fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateState {
    pub owner: Party,
    pub message: String,
}

/// The domain payload of a state. One variant per state type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateData {
    Car(CarState),
    Template(TemplateState),
}

impl StateData {
    /// Type name as reported in contract violations.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Car(_) => "CarState",
            Self::Template(_) => "TemplateState",
        }
    }

    /// The parties the payload itself names as participants.
    pub fn participants(&self) -> Vec<Party> {
        match self {
            Self::Car(car) => car.participants(),
            Self::Template(t) => vec![t.owner.clone()],
        }
    }

    pub fn as_car(&self) -> Option<&CarState> {
        match self {
            Self::Car(car) => Some(car),
            Self::Template(_) => None,
        }
    }

    fn write_canonical(&self, w: &mut CanonicalWriter) {
        match self {
            Self::Car(car) => {
                w.put_u8(1);
                car.write_canonical(w);
            }
            Self::Template(t) => {
                w.put_u8(2)
                    .put_bytes(&t.owner.canonical_bytes())
                    .put_str(&t.message);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// An immutable ledger fact.
///
/// Fields are private and there are no setters: once built, a state never
/// changes. [`successor`](Self::successor) produces a new state in the same
/// lineage instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    linear_id: UniqueIdentifier,
    participants: Vec<Party>,
    data: StateData,
}

impl LedgerState {
    /// Fresh lineage for `data`, participants taken from the payload.
    pub fn issue(data: StateData, external_id: Option<String>) -> Self {
        let participants = data.participants();
        Self::from_parts(UniqueIdentifier::new(external_id), participants, data)
    }

    /// Assemble a state from explicit parts. Participants are sorted and
    /// deduplicated, so the participant set is order-insensitive. An empty
    /// set is representable here; the transaction builder refuses it.
    pub fn from_parts(
        linear_id: UniqueIdentifier,
        mut participants: Vec<Party>,
        data: StateData,
    ) -> Self {
        participants.sort();
        participants.dedup();
        Self {
            linear_id,
            participants,
            data,
        }
    }

    /// Next state in this lineage: same linear id, new payload, participants
    /// recomputed from the new payload.
    pub fn successor(&self, data: StateData) -> Self {
        let participants = data.participants();
        Self::from_parts(self.linear_id.clone(), participants, data)
    }

    pub fn linear_id(&self) -> &UniqueIdentifier {
        &self.linear_id
    }

    pub fn participants(&self) -> &[Party] {
        &self.participants
    }

    pub fn data(&self) -> &StateData {
        &self.data
    }

    /// Canonical encoding. Participants are re-sorted here as well, so a
    /// state decoded from an untrusted peer still hashes the same way.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut w = CanonicalWriter::with_capacity(512);
        self.write_canonical(&mut w);
        w.finish()
    }

    pub(crate) fn write_canonical(&self, w: &mut CanonicalWriter) {
        self.linear_id.write_canonical(w);
        let mut sorted: Vec<&Party> = self.participants.iter().collect();
        sorted.sort();
        sorted.dedup();
        w.put_len(sorted.len());
        for p in sorted {
            w.put_bytes(&p.canonical_bytes());
        }
        self.data.write_canonical(w);
    }
}

// ---------------------------------------------------------------------------
// StateAndRef
// ---------------------------------------------------------------------------

/// A state together with the reference that points at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    pub state: LedgerState,
    pub reference: StateRef,
}

impl StateAndRef {
    pub fn new(state: LedgerState, reference: StateRef) -> Self {
        Self { state, reference }
    }

    pub(crate) fn write_canonical(&self, w: &mut CanonicalWriter) {
        self.reference.write_canonical(w);
        self.state.write_canonical(w);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
