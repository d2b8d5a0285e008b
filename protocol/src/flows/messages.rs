//! Messages exchanged on a flow session.
//!
//! One session carries one transaction attempt:
//!
//! ```text
//! initiator                               counterparty
//!     ── Proposal(signed by initiator) ──►
//!     ◄── Signature | Reject ────────────
//!     ── Finalized | Abort ──────────────►
//! ```

use serde::{Deserialize, Serialize};

use crate::crypto::keys::{PartyPublicKey, PartySignature};
use crate::transaction::{FinalizedTransaction, SignedTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMessage {
    /// The proposal, carrying at least the initiator's signature.
    Proposal(SignedTransaction),

    /// A counterparty's signature over the proposal's canonical bytes.
    Signature {
        signer: PartyPublicKey,
        signature: PartySignature,
    },

    /// A counterparty refuses to sign. Fatal to the round.
    Reject { reason: String },

    /// The notarised result. Receivers verify and store it.
    Finalized(FinalizedTransaction),

    /// The attempt is over without a result. Nothing to store.
    Abort { reason: String },
}

impl FlowMessage {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Proposal(_) => "proposal",
            Self::Signature { .. } => "signature",
            Self::Reject { .. } => "reject",
            Self::Finalized(_) => "finalized",
            Self::Abort { .. } => "abort",
        }
    }
}
