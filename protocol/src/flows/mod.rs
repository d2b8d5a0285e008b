//! # Flows
//!
//! The distributed half of the ledger: getting every required party to sign
//! a proposal, getting the notary to order it, and getting the result to
//! everyone involved.
//!
//! ## Architecture
//!
//! ```text
//! messages.rs : FlowMessage, the only thing that crosses a session
//! context.rs  : FlowContext: identity + service handles, passed explicitly
//! error.rs    : FlowError and its Validation / Protocol / Consensus classes
//! collect.rs  : initiator: signature collection state machine
//! finality.rs : initiator: notarise and broadcast
//! responder.rs: counterparty: verify, sign, await outcome; accept loop
//! car.rs      : issue / change entry points
//! ```
//!
//! ## One Attempt, End to End
//!
//! ```text
//!  initiator                                   counterparty (×N, concurrent)
//!  contract::verify ── reject? stop, no I/O
//!  sign
//!  ── Proposal ─────────────────────────────►  contract::verify, vault check
//!  ◄──────────────────── Signature | Reject ──  sign
//!  notary.submit ── DoubleSpend? ── Abort ───►
//!  ── Finalized ────────────────────────────►  verify, store
//!  store
//! ```
//!
//! An attempt that fails anywhere is over. The caller rebuilds against
//! current state; no flow ever reuses inputs from an aborted attempt.

pub mod car;
pub mod collect;
pub mod context;
pub mod error;
pub mod finality;
pub mod messages;
pub mod responder;

pub use car::{change, issue, ChangeRequest, IssueRequest};
pub use collect::{collect_signatures, CollectedSignatures, CollectionState};
pub use context::FlowContext;
pub use error::{ErrorClass, FlowError};
pub use finality::finalize;
pub use messages::FlowMessage;
pub use responder::{
    respond, AcceptAll, CarOutputsOnly, ProposalCheck, ResponderOutcome, ResponderService,
};

use futures::future::join_all;
use std::time::Duration;
use tracing::debug;

use crate::services::Session;
use crate::transaction::{FinalizedTransaction, TransactionProposal};

/// Collect signatures for `proposal`, then finalize it.
pub async fn execute(
    ctx: &FlowContext,
    proposal: TransactionProposal,
) -> Result<FinalizedTransaction, FlowError> {
    let collected = collect_signatures(ctx, proposal).await?;
    finalize(ctx, collected.signed, collected.sessions).await
}

/// Send `message` on every session concurrently, giving each send at most
/// `wait`. Failures are logged and otherwise ignored: a peer that has gone
/// away or stopped reading has nothing to learn.
pub(crate) async fn broadcast(
    sessions: &mut [Box<dyn Session>],
    message: &FlowMessage,
    wait: Duration,
) {
    let sends = sessions.iter_mut().map(|session| {
        let message = message.clone();
        async move {
            let peer = session.peer().clone();
            match tokio::time::timeout(wait, session.send(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(peer = %peer, error = %e, "broadcast send failed"),
                Err(_) => debug!(peer = %peer, ?wait, "broadcast send timed out"),
            }
        }
    });
    join_all(sends).await;
}
