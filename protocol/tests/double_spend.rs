//! Racing spends of the same car.
//!
//! Two fully signed transactions that consume the same input are taken to
//! the notary at the same time. Exactly one may come back attested; the
//! other must see a double spend, and nothing it produced may land in any
//! vault.

mod common;

use accord_protocol::flows::{
    change, collect_signatures, finalize, issue, ChangeRequest, CollectedSignatures, FlowContext,
    FlowError,
};
use accord_protocol::services::{NotaryError, VaultStore};
use accord_protocol::state::{StateAndRef, StateData};
use accord_protocol::transaction::{
    Command, CommandKind, TransactionBuilder, TransactionProposal,
};

use common::{settle, TestNetwork};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Issue a car and wait until all three parties hold it.
async fn issued_car(net: &TestNetwork, vin: &str) -> StateAndRef {
    let mut request = net.car_request("ABC1234");
    request.vin = vin.into();
    let issued = issue(&net.bank.ctx, request).await.unwrap();
    let car = issued.signed.proposal().output_refs()[0].clone();
    net.all_hold(car.reference).await;
    car
}

/// A change of `prior` that moves the car to `location`.
fn relocate(net: &TestNetwork, prior: &StateAndRef, location: &str) -> TransactionProposal {
    let mut car = prior.state.data().as_car().unwrap().clone();
    car.dealership_location = location.into();
    let output = prior.state.successor(StateData::Car(car));
    let command = Command::for_parties(CommandKind::Change, output.participants());
    TransactionBuilder::new()
        .notary(net.notary_party())
        .add_input_state(prior.clone())
        .add_output_state(output)
        .add_command(command)
        .build()
        .unwrap()
}

async fn sign_both(
    ctx: &FlowContext,
    a: TransactionProposal,
    b: TransactionProposal,
) -> (CollectedSignatures, CollectedSignatures) {
    // Nothing is spent yet, so every counterparty signs both.
    let (a, b) = tokio::join!(collect_signatures(ctx, a), collect_signatures(ctx, b));
    (a.unwrap(), b.unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_spends_have_exactly_one_winner() {
    let net = TestNetwork::start();
    let car = issued_car(&net, "KMHD841CBLU000001").await;

    let (a, b) = sign_both(
        &net.bank.ctx,
        relocate(&net, &car, "Seoul"),
        relocate(&net, &car, "Daegu"),
    )
    .await;
    let (a_id, b_id) = (a.signed.id(), b.signed.id());
    assert_ne!(a_id, b_id);

    let ctx = &net.bank.ctx;
    let (ra, rb) = tokio::join!(
        finalize(ctx, a.signed, a.sessions),
        finalize(ctx, b.signed, b.sessions)
    );

    let (winner, loser_err, loser_id) = match (ra, rb) {
        (Ok(w), Err(e)) => (w, e, b_id),
        (Err(e), Ok(w)) => (w, e, a_id),
        (ra, rb) => panic!("expected one winner, got {:?} and {:?}", ra.is_ok(), rb.is_ok()),
    };
    assert!(loser_err.is_double_spend(), "{loser_err}");
    match loser_err {
        FlowError::Consensus(NotaryError::DoubleSpend { conflicts }) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].state, car.reference);
            assert_eq!(conflicts[0].consumed_by, winner.id());
        }
        other => panic!("unexpected error {other:?}"),
    }

    let next = winner.signed.proposal().output_refs()[0].reference;
    net.all_hold(next).await;
    settle().await;
    for node in net.nodes() {
        assert!(node.vault.transaction(&loser_id).await.unwrap().is_none());
        assert_eq!(node.vault.transaction_count(), 2);
    }
    assert_eq!(net.notary.notarised_count(), 2);
    net.stop();
}

#[tokio::test]
async fn late_submission_of_a_spent_input_is_refused() {
    let net = TestNetwork::start();
    let car = issued_car(&net, "KMHD841CBLU000002").await;

    let (a, b) = sign_both(
        &net.bank.ctx,
        relocate(&net, &car, "Seoul"),
        relocate(&net, &car, "Daegu"),
    )
    .await;

    let first = finalize(&net.bank.ctx, a.signed, a.sessions).await.unwrap();
    let err = finalize(&net.bank.ctx, b.signed, b.sessions)
        .await
        .unwrap_err();
    assert!(err.is_double_spend());
    assert!(!err.is_retryable());

    let next = first.signed.proposal().output_refs()[0].reference;
    net.all_hold(next).await;
    let head = net
        .dealer
        .vault
        .unspent_by_linear_id(car.state.linear_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(head.state.data().as_car().unwrap().dealership_location, "Seoul");
    net.stop();
}

#[tokio::test]
async fn disjoint_inputs_both_finalize() {
    let net = TestNetwork::start();
    let one = issued_car(&net, "KMHD841CBLU000003").await;
    let two = issued_car(&net, "KMHD841CBLU000004").await;

    let mut move_one = ChangeRequest::new(one.state.linear_id().clone());
    move_one.dealership_location = Some("Seoul".into());
    let mut move_two = ChangeRequest::new(two.state.linear_id().clone());
    move_two.license_plate_number = Some("ZZZ0001".into());

    let ctx = &net.bank.ctx;
    let (r1, r2) = tokio::join!(change(ctx, move_one), change(ctx, move_two));
    let (r1, r2) = (r1.unwrap(), r2.unwrap());

    net.all_hold(r1.signed.proposal().output_refs()[0].reference)
        .await;
    net.all_hold(r2.signed.proposal().output_refs()[0].reference)
        .await;
    assert_eq!(net.notary.notarised_count(), 4);
    net.stop();
}
