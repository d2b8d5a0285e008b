//! # Responder
//!
//! The counterparty's half of the handshake. A responder trusts nothing it
//! receives; before signing it checks, on its own:
//!
//! - the contract accepts the proposal,
//! - the initiator's signature is there and valid, and nobody unexpected
//!   has signed,
//! - our key is actually required (otherwise signing would add an
//!   unexpected signer and poison the round),
//! - the designated notary is one we know,
//! - every input is unspent in *our* vault and identical to the copy the
//!   initiator embedded,
//! - the node's own acceptance policy ([`ProposalCheck`]) is satisfied.
//!
//! Any failure is answered with `Reject` and the session ends. After
//! signing, the responder waits (bounded by `finality_timeout`) for either
//! `Finalized`, which it verifies and stores, or `Abort`.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::context::FlowContext;
use super::error::FlowError;
use super::messages::FlowMessage;
use crate::contract;
use crate::services::{Inbox, Session, VaultError};
use crate::transaction::{FinalizedTransaction, SignedTransaction, TransactionProposal};

// ---------------------------------------------------------------------------
// Acceptance policy
// ---------------------------------------------------------------------------

/// Node-specific acceptance rule, applied on top of the contract.
///
/// The contract says what is *valid*; a policy says what this node is
/// *willing* to sign. Any `Fn(&TransactionProposal) -> Result<(), String>`
/// is a policy.
pub trait ProposalCheck: Send + Sync {
    fn check(&self, proposal: &TransactionProposal) -> Result<(), String>;
}

impl<F> ProposalCheck for F
where
    F: Fn(&TransactionProposal) -> Result<(), String> + Send + Sync,
{
    fn check(&self, proposal: &TransactionProposal) -> Result<(), String> {
        self(proposal)
    }
}

/// Signs anything the contract accepts.
pub struct AcceptAll;

impl ProposalCheck for AcceptAll {
    fn check(&self, _proposal: &TransactionProposal) -> Result<(), String> {
        Ok(())
    }
}

/// Only signs proposals whose outputs are all cars.
pub struct CarOutputsOnly;

impl ProposalCheck for CarOutputsOnly {
    fn check(&self, proposal: &TransactionProposal) -> Result<(), String> {
        match proposal.outputs().iter().find(|s| s.data().as_car().is_none()) {
            Some(other) => Err(format!(
                "this node only signs for cars, not {}",
                other.data().type_name()
            )),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// respond
// ---------------------------------------------------------------------------

/// How a responder session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponderOutcome {
    /// We signed and the transaction was notarised and stored.
    Finalized(FinalizedTransaction),
    /// We refused to sign.
    Rejected(String),
    /// We signed but the initiator aborted the attempt.
    Aborted(String),
}

/// Handle one incoming session end to end.
pub async fn respond(
    ctx: &FlowContext,
    mut session: Box<dyn Session>,
    policy: &dyn ProposalCheck,
) -> Result<ResponderOutcome, FlowError> {
    let peer = session.peer().clone();
    let signed = match session.receive(ctx.config.session_timeout()).await? {
        FlowMessage::Proposal(signed) => signed,
        other => {
            return Err(FlowError::UnexpectedMessage {
                peer: peer.name,
                got: other.kind(),
            })
        }
    };
    let txid = signed.id();
    debug!(txid = %txid, from = %peer, "proposal received");

    if let Err(reason) = check_proposal(ctx, &signed, &peer.owning_key, policy).await {
        info!(txid = %txid, from = %peer, reason = %reason, "rejecting proposal");
        // The initiator may already be gone; the rejection stands either way.
        let _ = session
            .send(FlowMessage::Reject {
                reason: reason.clone(),
            })
            .await;
        return Ok(ResponderOutcome::Rejected(reason));
    }

    let signature = ctx
        .signer
        .sign(ctx.our_key(), &signed.proposal().canonical_bytes())
        .await?;
    session
        .send(FlowMessage::Signature {
            signer: ctx.our_key().clone(),
            signature,
        })
        .await?;
    debug!(txid = %txid, "signature sent, awaiting outcome");

    match session.receive(ctx.config.finality_timeout()).await? {
        FlowMessage::Finalized(finalized) => {
            if finalized.id() != txid {
                return Err(FlowError::UnexpectedMessage {
                    peer: peer.name,
                    got: "finalized (different transaction)",
                });
            }
            finalized.verify(signed.proposal().notary())?;
            ctx.vault.store(&finalized).await?;
            info!(txid = %txid, "stored finalized transaction");
            Ok(ResponderOutcome::Finalized(finalized))
        }
        FlowMessage::Abort { reason } => {
            info!(txid = %txid, reason = %reason, "initiator aborted");
            Ok(ResponderOutcome::Aborted(reason))
        }
        other => Err(FlowError::UnexpectedMessage {
            peer: peer.name,
            got: other.kind(),
        }),
    }
}

/// Every independent check a counterparty runs before signing. Returns the
/// reason to put in the `Reject`.
async fn check_proposal(
    ctx: &FlowContext,
    signed: &SignedTransaction,
    initiator: &crate::crypto::keys::PartyPublicKey,
    policy: &dyn ProposalCheck,
) -> Result<(), String> {
    let proposal = signed.proposal();

    contract::verify(proposal).map_err(|v| format!("contract violation: {}", v))?;

    let required = proposal.required_signers();
    if !required.contains(ctx.our_key()) {
        return Err("we are not a required signer".into());
    }
    if !signed.signatures().contains_key(initiator) {
        return Err("initiator has not signed".into());
    }
    // Everyone but the initiator may still be missing at this point.
    let mut may_be_missing = required;
    may_be_missing.remove(initiator);
    signed
        .verify_signatures_except(&may_be_missing)
        .map_err(|e| e.to_string())?;

    if !ctx.network_map.is_notary(&proposal.notary().owning_key) {
        return Err(format!("unknown notary {}", proposal.notary()));
    }

    for input in proposal.inputs() {
        match ctx.vault.lookup_unspent(&input.reference).await {
            Ok(ours) if ours.state == input.state => {}
            Ok(_) => return Err(format!("input {} does not match our copy", input.reference)),
            Err(VaultError::NotFound(r)) => {
                return Err(format!("input {} is not unspent in our vault", r))
            }
            Err(e) => return Err(format!("vault unavailable: {}", e)),
        }
    }

    policy.check(proposal)
}

// ---------------------------------------------------------------------------
// ResponderService
// ---------------------------------------------------------------------------

/// Accept loop: one spawned [`respond`] task per incoming session.
pub struct ResponderService {
    ctx: FlowContext,
    policy: Arc<dyn ProposalCheck>,
}

impl ResponderService {
    pub fn new(ctx: FlowContext) -> Self {
        Self {
            ctx,
            policy: Arc::new(AcceptAll),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ProposalCheck>) -> Self {
        self.policy = policy;
        self
    }

    /// Runs until `shutdown` flips to `true`, its sender drops, or the inbox
    /// closes. Sessions already being handled are left to finish.
    pub async fn run(self, mut inbox: Inbox, mut shutdown: watch::Receiver<bool>) {
        info!(party = %self.ctx.identity, "responder started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                incoming = inbox.recv() => match incoming {
                    Some(session) => self.spawn_session(session),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!(party = %self.ctx.identity, "responder stopped");
    }

    /// `run` on its own task.
    pub fn spawn(self, inbox: Inbox, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(inbox, shutdown))
    }

    fn spawn_session(&self, session: Box<dyn Session>) {
        let ctx = self.ctx.clone();
        let policy = self.policy.clone();
        tokio::spawn(async move {
            let peer = session.peer().clone();
            match respond(&ctx, session, policy.as_ref()).await {
                Ok(ResponderOutcome::Finalized(tx)) => {
                    debug!(peer = %peer, txid = %tx.id(), "responder finished")
                }
                Ok(outcome) => debug!(peer = %peer, outcome = ?outcome, "responder finished"),
                Err(e) => warn!(peer = %peer, error = %e, "responder failed"),
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
