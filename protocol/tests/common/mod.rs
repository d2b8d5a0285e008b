//! Shared harness: a bank, a dealer and a manufacturer on one in-memory
//! network, each with its own key store, vault and responder loop, plus a
//! single in-memory notary.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use accord_protocol::config::FlowConfig;
use accord_protocol::crypto::PartyKeypair;
use accord_protocol::flows::{
    AcceptAll, FlowContext, IssueRequest, ProposalCheck, ResponderService,
};
use accord_protocol::identity::{NetworkMap, Party};
use accord_protocol::services::{
    InMemoryNetwork, InMemoryNotary, InMemoryVault, KeyStore, NotaryService, VaultStore,
};
use accord_protocol::state::{CarState, LedgerState, StateData, StateRef};
use accord_protocol::transaction::{
    Command, CommandKind, TransactionBuilder, TransactionProposal,
};

pub const BANK: &str = "O=Northwind Bank,L=London,C=GB";
pub const DEALER: &str = "O=Harbour Motors,L=Busan,C=KR";
pub const MAKER: &str = "O=Hanul Automotive,L=Ulsan,C=KR";
pub const NOTARY: &str = "O=Notary Service,L=Zurich,C=CH";

pub struct TestNode {
    pub party: Party,
    pub ctx: FlowContext,
    pub vault: Arc<InMemoryVault>,
}

pub struct TestNetwork {
    pub bank: TestNode,
    pub dealer: TestNode,
    pub maker: TestNode,
    pub notary: Arc<InMemoryNotary>,
    pub net: InMemoryNetwork,
    shutdown: watch::Sender<bool>,
}

/// Per-node responder settings.
pub struct Responders {
    pub dealer: Option<Arc<dyn ProposalCheck>>,
    pub maker: Option<Arc<dyn ProposalCheck>>,
}

impl Default for Responders {
    fn default() -> Self {
        Self {
            dealer: Some(Arc::new(AcceptAll)),
            maker: Some(Arc::new(AcceptAll)),
        }
    }
}

fn keypair(seed: u8) -> PartyKeypair {
    PartyKeypair::from_seed(&[seed; 32])
}

impl TestNetwork {
    pub fn start() -> Self {
        Self::start_with(FlowConfig::with_timeout_ms(2_000), Responders::default())
    }

    /// `None` for a responder means the party is on the network but never
    /// answers: sessions to it are accepted and left unread.
    pub fn start_with(config: FlowConfig, responders: Responders) -> Self {
        let (bank_kp, dealer_kp, maker_kp) = (keypair(1), keypair(2), keypair(3));
        let bank = Party::new(BANK, bank_kp.public_key());
        let dealer = Party::new(DEALER, dealer_kp.public_key());
        let maker = Party::new(MAKER, maker_kp.public_key());
        let notary = Arc::new(InMemoryNotary::new(NOTARY, keypair(9)));

        let mut map = NetworkMap::new();
        map.add_party(bank.clone())
            .add_party(dealer.clone())
            .add_party(maker.clone())
            .add_notary(notary.identity().clone());
        let map = Arc::new(map);

        let net = InMemoryNetwork::new();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let node = |party: Party, kp: PartyKeypair, policy: Option<Arc<dyn ProposalCheck>>| {
            let (messaging, inbox) = net.register(party.clone());
            let vault = Arc::new(InMemoryVault::new());
            let ctx = FlowContext {
                identity: party.clone(),
                signer: Arc::new(KeyStore::with_key(kp)),
                messaging: Arc::new(messaging),
                notary: notary.clone(),
                vault: vault.clone(),
                network_map: map.clone(),
                config: config.clone(),
            };
            match policy {
                Some(p) => {
                    ResponderService::new(ctx.clone())
                        .with_policy(p)
                        .spawn(inbox, shutdown_rx.clone());
                }
                None => {
                    // Keep the inbox alive but never drain it.
                    tokio::spawn(async move {
                        let _inbox = inbox;
                        std::future::pending::<()>().await;
                    });
                }
            }
            TestNode { party, ctx, vault }
        };

        let bank = node(bank, bank_kp, Some(Arc::new(AcceptAll)));
        let dealer = node(dealer, dealer_kp, responders.dealer);
        let maker = node(maker, maker_kp, responders.maker);

        Self {
            bank,
            dealer,
            maker,
            notary,
            net,
            shutdown,
        }
    }

    pub fn nodes(&self) -> [&TestNode; 3] {
        [&self.bank, &self.dealer, &self.maker]
    }

    pub fn notary_party(&self) -> Party {
        self.notary.identity().clone()
    }

    pub fn car_request(&self, plate: &str) -> IssueRequest {
        IssueRequest {
            holding_dealer: self.dealer.party.clone(),
            manufacturer: self.maker.party.clone(),
            vin: "KMHD841CBLU123456".into(),
            license_plate_number: plate.into(),
            make: "Hanul".into(),
            model: "Aurora".into(),
            dealership_location: "Busan".into(),
        }
    }

    /// The proposal `issue` would build from the bank for `plate`.
    pub fn issue_proposal(&self, plate: &str) -> TransactionProposal {
        let request = self.car_request(plate);
        let car = CarState {
            owning_bank: self.bank.party.clone(),
            holding_dealer: request.holding_dealer,
            manufacturer: request.manufacturer,
            vin: request.vin,
            license_plate_number: request.license_plate_number,
            make: request.make,
            model: request.model,
            dealership_location: request.dealership_location,
        };
        let output = LedgerState::issue(StateData::Car(car), None);
        let command = Command::for_parties(CommandKind::Issue, output.participants());
        TransactionBuilder::new()
            .notary(self.notary_party())
            .add_output_state(output)
            .add_command(command)
            .build()
            .expect("issue proposal should build")
    }

    /// Wait until every node's vault holds `state` unspent.
    pub async fn all_hold(&self, state: StateRef) {
        for node in self.nodes() {
            let vault = node.vault.clone();
            eventually(move || {
                let vault = vault.clone();
                async move { vault.lookup_unspent(&state).await.is_ok() }
            })
            .await;
        }
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Poll `check` until it returns true. Panics after five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Give responders a moment to react to whatever was just broadcast.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
