//! # Signature Collection
//!
//! The initiator's half of the signing handshake.
//!
//! ```text
//!  Proposed ──► CounterpartyVerifying ──► CounterpartySigned({..}) ──► FullySigned
//!      │                 │                         │
//!      └─────────────────┴─────────────────────────┴──────────────► Aborted(reason)
//! ```
//!
//! 1. Run the contract locally. A violation ends the attempt here, before
//!    any session is opened.
//! 2. Sign, resolve every other required signer through the network map.
//! 3. One tokio task per counterparty: open a session, send the proposal,
//!    wait for a signature or a rejection. All three steps share one
//!    deadline, so a peer whose inbox is full cannot stall the round.
//! 4. Any failure raises a shared cancel flag so the remaining tasks stop
//!    waiting. The initiator then sends `Abort` on every session it still
//!    holds and returns [`FlowError::Aborted`].
//! 5. Otherwise the signer set must come out exactly equal to the required
//!    set, and the round is `FullySigned`.
//!
//! Sessions run independently; replies can arrive in any order and the
//! result does not depend on it.

use futures::future::join_all;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::context::FlowContext;
use super::error::FlowError;
use super::messages::FlowMessage;
use super::broadcast;
use crate::contract;
use crate::crypto::hash::SecureHash;
use crate::crypto::keys::{PartyPublicKey, PartySignature};
use crate::identity::Party;
use crate::services::{Messaging, Session};
use crate::transaction::{SignedTransaction, TransactionProposal};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where a signature collection round stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    Proposed,
    CounterpartyVerifying,
    /// Counterparty keys whose signatures are in so far.
    CounterpartySigned(BTreeSet<PartyPublicKey>),
    FullySigned,
    Aborted(String),
}

impl CollectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FullySigned | Self::Aborted(_))
    }
}

/// Output of a successful round: the fully signed transaction, the sessions
/// that finality must report back on, and the states the round went through.
pub struct CollectedSignatures {
    pub signed: SignedTransaction,
    pub sessions: Vec<Box<dyn Session>>,
    pub history: Vec<CollectionState>,
}

struct Tracker {
    txid: SecureHash,
    history: Vec<CollectionState>,
}

impl Tracker {
    fn new(txid: SecureHash) -> Self {
        Self {
            txid,
            history: vec![CollectionState::Proposed],
        }
    }

    fn advance(&mut self, next: CollectionState) {
        debug!(txid = %self.txid, state = ?next, "signature collection");
        self.history.push(next);
    }
}

// ---------------------------------------------------------------------------
// Per-counterparty task
// ---------------------------------------------------------------------------

enum Refusal {
    /// Stopped waiting because another counterparty failed first.
    Cancelled,
    Failed(String),
}

struct SessionOutcome {
    peer: Party,
    session: Option<Box<dyn Session>>,
    reply: Result<PartySignature, Refusal>,
}

/// Resolves once the cancel flag is raised. Never resolves if every sender
/// is gone without raising it.
async fn cancelled(mut flag: watch::Receiver<bool>) {
    loop {
        if *flag.borrow() {
            return;
        }
        if flag.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// How a bounded step of the exchange ended.
enum Step<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

/// Run `step` against the shared deadline. Raising the cancel flag ends it
/// early.
async fn bounded<T>(
    deadline: Instant,
    cancel_rx: &watch::Receiver<bool>,
    step: impl Future<Output = T>,
) -> Step<T> {
    tokio::select! {
        r = tokio::time::timeout_at(deadline, step) => match r {
            Ok(value) => Step::Done(value),
            Err(_) => Step::TimedOut,
        },
        _ = cancelled(cancel_rx.clone()) => Step::Cancelled,
    }
}

/// One counterparty's side of the round. Opening the session, sending the
/// proposal and waiting for the reply share a single deadline of `wait`.
async fn exchange(
    messaging: Arc<dyn Messaging>,
    peer: Party,
    proposal: SignedTransaction,
    wait: Duration,
    cancel_rx: watch::Receiver<bool>,
    cancel_tx: Arc<watch::Sender<bool>>,
) -> SessionOutcome {
    let deadline = Instant::now() + wait;
    let fail = |peer: Party, session: Option<Box<dyn Session>>, reason: String| {
        let _ = cancel_tx.send(true);
        SessionOutcome {
            peer,
            session,
            reply: Err(Refusal::Failed(reason)),
        }
    };
    let stop = |peer: Party, session: Option<Box<dyn Session>>| SessionOutcome {
        peer,
        session,
        reply: Err(Refusal::Cancelled),
    };
    let timed_out = |peer: &Party| format!("{}: timed out after {:?}", peer, wait);

    let mut session = match bounded(deadline, &cancel_rx, messaging.open_session(&peer)).await {
        Step::Done(Ok(s)) => s,
        Step::Done(Err(e)) => {
            let reason = format!("cannot reach {}: {}", peer, e);
            return fail(peer, None, reason);
        }
        Step::TimedOut => {
            let reason = timed_out(&peer);
            return fail(peer, None, reason);
        }
        Step::Cancelled => return stop(peer, None),
    };

    let sent = bounded(
        deadline,
        &cancel_rx,
        session.send(FlowMessage::Proposal(proposal)),
    )
    .await;
    match sent {
        Step::Done(Ok(())) => {}
        Step::Done(Err(e)) => {
            let reason = format!("{}: {}", peer, e);
            return fail(peer, Some(session), reason);
        }
        Step::TimedOut => {
            let reason = timed_out(&peer);
            return fail(peer, Some(session), reason);
        }
        Step::Cancelled => return stop(peer, Some(session)),
    }

    let received = bounded(deadline, &cancel_rx, session.receive(wait)).await;
    let reply = match received {
        Step::Cancelled => return stop(peer, Some(session)),
        Step::TimedOut => Err(timed_out(&peer)),
        Step::Done(Ok(FlowMessage::Signature { signer, signature }))
            if signer == peer.owning_key =>
        {
            Ok(signature)
        }
        Step::Done(Ok(FlowMessage::Signature { signer, .. })) => Err(format!(
            "{} answered with a signature for {}",
            peer,
            signer.short()
        )),
        Step::Done(Ok(FlowMessage::Reject { reason })) => {
            Err(format!("{} rejected: {}", peer, reason))
        }
        Step::Done(Ok(other)) => Err(format!("{} sent unexpected {}", peer, other.kind())),
        Step::Done(Err(e)) => Err(format!("{}: {}", peer, e)),
    };

    match reply {
        Ok(signature) => SessionOutcome {
            peer,
            session: Some(session),
            reply: Ok(signature),
        },
        Err(reason) => fail(peer, Some(session), reason),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Drive one signature collection round for `proposal`.
pub async fn collect_signatures(
    ctx: &FlowContext,
    proposal: TransactionProposal,
) -> Result<CollectedSignatures, FlowError> {
    contract::verify(&proposal)?;

    let txid = proposal.id();
    let me = ctx.our_key().clone();
    let required = proposal.required_signers();
    if !required.contains(&me) {
        return Err(FlowError::NotASigner(ctx.identity.name.clone()));
    }

    let counterparties: Vec<Party> = required
        .iter()
        .filter(|k| **k != me)
        .map(|k| ctx.network_map.party_for_key(k).cloned())
        .collect::<Result<_, _>>()?;

    let mut tracker = Tracker::new(txid);
    let mut signed = SignedTransaction::new(proposal);
    let payload = signed.proposal().canonical_bytes();
    let own = ctx.signer.sign(&me, &payload).await?;
    signed.add_signature(me, own)?;

    if counterparties.is_empty() {
        tracker.advance(CollectionState::FullySigned);
        return Ok(CollectedSignatures {
            signed,
            sessions: Vec::new(),
            history: tracker.history,
        });
    }

    info!(
        txid = %txid,
        counterparties = counterparties.len(),
        "collecting signatures"
    );
    tracker.advance(CollectionState::CounterpartyVerifying);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    let tasks = counterparties.into_iter().map(|peer| {
        tokio::spawn(exchange(
            ctx.messaging.clone(),
            peer,
            signed.clone(),
            ctx.config.session_timeout(),
            cancel_rx.clone(),
            cancel_tx.clone(),
        ))
    });
    let outcomes = join_all(tasks).await;

    let mut sessions = Vec::with_capacity(outcomes.len());
    let mut signed_by = BTreeSet::new();
    let mut failure: Option<String> = None;
    let mut saw_cancel = false;

    for joined in outcomes {
        let outcome = match joined {
            Ok(o) => o,
            Err(e) => {
                failure.get_or_insert(format!("counterparty task failed: {}", e));
                continue;
            }
        };
        sessions.extend(outcome.session);
        match outcome.reply {
            Ok(signature) => {
                let key = outcome.peer.owning_key.clone();
                match signed.add_signature(key.clone(), signature) {
                    Ok(()) => {
                        signed_by.insert(key);
                        tracker.advance(CollectionState::CounterpartySigned(signed_by.clone()));
                    }
                    Err(e) => {
                        failure.get_or_insert(format!("{}: {}", outcome.peer, e));
                    }
                }
            }
            Err(Refusal::Failed(reason)) => {
                failure.get_or_insert(reason);
            }
            Err(Refusal::Cancelled) => saw_cancel = true,
        }
    }

    if failure.is_none() && saw_cancel {
        failure = Some("signature collection cancelled".to_string());
    }
    if failure.is_none() {
        if let Err(e) = signed.verify_required_signatures() {
            failure = Some(e.to_string());
        }
    }

    if let Some(reason) = failure {
        warn!(txid = %txid, reason = %reason, "signature collection aborted");
        tracker.advance(CollectionState::Aborted(reason.clone()));
        broadcast(
            &mut sessions,
            &FlowMessage::Abort {
                reason: reason.clone(),
            },
            ctx.config.session_timeout(),
        )
        .await;
        return Err(FlowError::Aborted {
            reason,
            history: tracker.history,
        });
    }

    tracker.advance(CollectionState::FullySigned);
    info!(txid = %txid, signers = signed.signatures().len(), "fully signed");
    Ok(CollectedSignatures {
        signed,
        sessions,
        history: tracker.history,
    })
}
