//! # Finality
//!
//! Takes a fully signed transaction to the notary and reports the outcome
//! to every counterparty session.
//!
//! 1. Re-check the signature set. The notary would refuse an incomplete
//!    one anyway; failing here saves a round trip.
//! 2. Submit to the notary, bounded by `notary_timeout`. A timeout counts as
//!    the notary being unavailable.
//! 3. On any notary error, send `Abort` to every session and stop. There is
//!    no retry with the same inputs from inside the flow.
//! 4. Verify the attestation, send `Finalized` to every session so each
//!    participant stores it, then store it in our own vault.

use tracing::{info, warn};

use super::broadcast;
use super::context::FlowContext;
use super::error::FlowError;
use super::messages::FlowMessage;
use crate::services::{NotarisationRequest, NotaryError, Session};
use crate::transaction::{FinalizedTransaction, SignedTransaction};

pub async fn finalize(
    ctx: &FlowContext,
    signed: SignedTransaction,
    mut sessions: Vec<Box<dyn Session>>,
) -> Result<FinalizedTransaction, FlowError> {
    let txid = signed.id();

    if let Err(e) = signed.verify_required_signatures() {
        abort_all(ctx, &mut sessions, e.to_string()).await;
        return Err(e.into());
    }

    let request = NotarisationRequest {
        transaction: signed.clone(),
    };
    let wait = ctx.config.notary_timeout();
    let submitted = match tokio::time::timeout(wait, ctx.notary.submit(request)).await {
        Ok(result) => result,
        Err(_) => Err(NotaryError::Unavailable(format!(
            "no attestation within {:?}",
            wait
        ))),
    };

    let attestation = match submitted {
        Ok(a) => a,
        Err(e) => {
            warn!(txid = %txid, error = %e, "notarisation failed");
            abort_all(ctx, &mut sessions, e.to_string()).await;
            return Err(e.into());
        }
    };

    let finalized = FinalizedTransaction::new(signed, attestation);
    if let Err(e) = finalized.verify(ctx.notary.identity()) {
        warn!(txid = %txid, error = %e, "notary returned a bad attestation");
        abort_all(ctx, &mut sessions, e.to_string()).await;
        return Err(e.into());
    }

    // Counterparties hear about it even if our own store fails below.
    broadcast(
        &mut sessions,
        &FlowMessage::Finalized(finalized.clone()),
        ctx.config.session_timeout(),
    )
    .await;
    ctx.vault.store(&finalized).await?;

    info!(
        txid = %txid,
        sequence = finalized.attestation.sequence,
        participants = sessions.len() + 1,
        "transaction finalized"
    );
    Ok(finalized)
}

async fn abort_all(ctx: &FlowContext, sessions: &mut [Box<dyn Session>], reason: String) {
    broadcast(
        sessions,
        &FlowMessage::Abort { reason },
        ctx.config.session_timeout(),
    )
    .await;
}
