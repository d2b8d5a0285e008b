//! Signature collection rounds observed from the initiator: the states a
//! round passes through, and how it behaves when a counterparty stops
//! reading its inbox.

mod common;

use std::sync::Arc;
use std::time::Duration;

use accord_protocol::config::FlowConfig;
use accord_protocol::flows::{
    collect_signatures, finalize, issue, CollectionState, FlowError,
};
use accord_protocol::transaction::TransactionProposal;

use common::{settle, Responders, TestNetwork};

#[tokio::test]
async fn successful_round_walks_every_state_in_order() {
    let net = TestNetwork::start();
    let proposal = net.issue_proposal("ABC1234");

    let collected = collect_signatures(&net.bank.ctx, proposal).await.unwrap();
    let history = &collected.history;

    assert_eq!(history.first(), Some(&CollectionState::Proposed));
    assert_eq!(history.get(1), Some(&CollectionState::CounterpartyVerifying));
    assert_eq!(history.last(), Some(&CollectionState::FullySigned));
    assert!(history.last().unwrap().is_terminal());
    assert!(history[..history.len() - 1].iter().all(|s| !s.is_terminal()));

    // One CounterpartySigned step per counterparty, each set one larger.
    let sizes: Vec<usize> = history
        .iter()
        .filter_map(|s| match s {
            CollectionState::CounterpartySigned(keys) => Some(keys.len()),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![1, 2]);
    match &history[history.len() - 2] {
        CollectionState::CounterpartySigned(keys) => {
            assert!(keys.contains(&net.dealer.party.owning_key));
            assert!(keys.contains(&net.maker.party.owning_key));
        }
        other => panic!("expected the full counterparty set, got {other:?}"),
    }

    finalize(&net.bank.ctx, collected.signed, collected.sessions)
        .await
        .unwrap();
    net.stop();
}

#[tokio::test]
async fn refused_round_ends_in_aborted() {
    let refuse = |_: &TransactionProposal| -> Result<(), String> {
        Err("dealer is closed".to_string())
    };
    let net = TestNetwork::start_with(
        FlowConfig::with_timeout_ms(2_000),
        Responders {
            dealer: Some(Arc::new(refuse)),
            ..Responders::default()
        },
    );

    let err = collect_signatures(&net.bank.ctx, net.issue_proposal("ABC1234"))
        .await
        .err()
        .expect("a refused round must not be fully signed");
    let (reason, history) = match err {
        FlowError::Aborted { reason, history } => (reason, history),
        other => panic!("expected an abort, got {other:?}"),
    };

    assert_eq!(history.first(), Some(&CollectionState::Proposed));
    assert_eq!(history.get(1), Some(&CollectionState::CounterpartyVerifying));
    let last = history.last().unwrap();
    assert!(last.is_terminal());
    assert_eq!(last, &CollectionState::Aborted(reason.clone()));
    assert!(reason.contains("dealer is closed"), "{reason}");
    assert!(!history.contains(&CollectionState::FullySigned));
    net.stop();
}

#[tokio::test]
async fn full_inbox_does_not_stall_the_initiator() {
    // The maker never drains its inbox, so after enough attempts opening a
    // session to it blocks. Every attempt must still end within its timeout.
    let net = TestNetwork::start_with(
        FlowConfig::with_timeout_ms(100),
        Responders {
            maker: None,
            ..Responders::default()
        },
    );

    for attempt in 0..24 {
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            issue(&net.bank.ctx, net.car_request("ABC1234")),
        )
        .await
        .unwrap_or_else(|_| panic!("attempt {attempt} hung"));
        match outcome {
            Err(FlowError::Aborted { reason, .. }) => {
                assert!(reason.contains("timed out"), "attempt {attempt}: {reason}")
            }
            other => panic!("attempt {attempt}: expected an abort, got {other:?}"),
        }
    }

    settle().await;
    assert_eq!(net.notary.notarised_count(), 0);
    net.stop();
}
