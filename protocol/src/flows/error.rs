//! Error types for flows.
//!
//! Every flow returns a [`FlowError`]. Callers mostly care about one
//! question: can I try again? [`FlowError::is_retryable`] answers it, and
//! [`FlowError::class`] sorts errors into the three families below.
//!
//! | Class        | Examples                                 | Retry?                         |
//! |--------------|------------------------------------------|--------------------------------|
//! | `Validation` | contract violation, bad build            | fix the proposal               |
//! | `Protocol`   | counterparty reject, timeout, disconnect | rebuild against current state  |
//! | `Consensus`  | double spend, notary unavailable         | only `Unavailable`, with backoff |
//! | `Local`      | vault, key store, unknown party          | fix the node                   |

use thiserror::Error;

use super::collect::CollectionState;
use crate::contract::ContractViolation;
use crate::identity::IdentityError;
use crate::services::{NotaryError, SessionError, SigningError, VaultError};
use crate::state::UniqueIdentifier;
use crate::transaction::{AttestationError, BuildError, SignatureSetError};

/// Coarse error family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Protocol,
    Consensus,
    Local,
}

impl ErrorClass {
    /// Lower-case label, used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Protocol => "protocol",
            Self::Consensus => "consensus",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    /// The proposal breaks the contract. Detected locally, before any I/O.
    #[error("contract violation: {0}")]
    Validation(#[from] ContractViolation),

    #[error("cannot build proposal: {0}")]
    Build(#[from] BuildError),

    /// We are not among the proposal's required signers.
    #[error("{0} is not a required signer of this proposal")]
    NotASigner(String),

    /// Some session failed or a counterparty rejected. No signatures from
    /// this round may be reused. `history` is every collection state the
    /// round went through, ending in `Aborted`.
    #[error("aborted: {reason}")]
    Aborted {
        reason: String,
        history: Vec<CollectionState>,
    },

    #[error("consensus: {0}")]
    Consensus(#[from] NotaryError),

    #[error("session: {0}")]
    Session(#[from] SessionError),

    #[error("signature set: {0}")]
    NotFullySigned(#[from] SignatureSetError),

    #[error("attestation: {0}")]
    Attestation(#[from] AttestationError),

    #[error("signing: {0}")]
    Signing(#[from] SigningError),

    #[error("vault: {0}")]
    Vault(#[from] VaultError),

    #[error("identity: {0}")]
    UnknownParty(#[from] IdentityError),

    #[error("no unspent state with linear id {0}")]
    StateNotFound(UniqueIdentifier),

    /// The peer sent something the protocol does not allow at this point.
    #[error("unexpected {got} message from {peer}")]
    UnexpectedMessage { peer: String, got: &'static str },
}

impl FlowError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::Build(_) | Self::NotASigner(_) | Self::StateNotFound(_) => {
                ErrorClass::Validation
            }
            Self::Aborted { .. }
            | Self::Session(_)
            | Self::NotFullySigned(_)
            | Self::UnexpectedMessage { .. } => ErrorClass::Protocol,
            Self::Consensus(_) | Self::Attestation(_) => ErrorClass::Consensus,
            Self::Signing(_) | Self::Vault(_) | Self::UnknownParty(_) => ErrorClass::Local,
        }
    }

    /// Only an unavailable notary is worth retrying as-is. A double spend
    /// means the inputs are gone; anything protocol-level means the caller
    /// must rebuild against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Consensus(NotaryError::Unavailable(_)))
    }

    pub fn is_double_spend(&self) -> bool {
        matches!(self, Self::Consensus(NotaryError::DoubleSpend { .. }))
    }
}
