//! # Transaction Module
//!
//! Construction, signing and finality records for ledger transactions. Every
//! issuance or change of a state travels through here as a
//! [`TransactionProposal`].
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : Command and CommandKind
//! builder.rs     : TransactionProposal and the fluent TransactionBuilder
//! signing.rs     : SignedTransaction: proposal + signer → signature map
//! verification.rs: exact signature-set checks
//! attestation.rs : NotaryAttestation and FinalizedTransaction
//! codec.rs       : bincode wire encoding
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] assembles an immutable proposal.
//! 2. **Verify**: every party runs [`crate::contract::verify`] on its own.
//! 3. **Sign**: signatures accumulate in a [`SignedTransaction`].
//! 4. **Notarise**: the notary locks the inputs and returns a
//!    [`NotaryAttestation`].
//! 5. **Store**: each participant keeps the [`FinalizedTransaction`].
//!
//! ## Design Decisions
//!
//! - Transaction ids are `double_sha256` of the canonical bytes, the same
//!   bytes every party signs.
//! - The canonical encoding is hand-written, not serde. Wire format and
//!   signed format are allowed to drift apart; signed format is not.
//! - Inputs carry the resolved prior state. A counterparty can run the
//!   contract without fetching history, and checks the embedded copy
//!   against its own vault.

pub mod attestation;
pub mod builder;
pub mod codec;
pub mod signing;
pub mod types;
pub mod verification;

pub use attestation::{AttestationError, FinalizedTransaction, NotaryAttestation};
pub use builder::{BuildError, TransactionBuilder, TransactionProposal};
pub use codec::CodecError;
pub use signing::SignedTransaction;
pub use types::{Command, CommandKind};
pub use verification::SignatureSetError;
