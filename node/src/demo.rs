//! # Local Demo
//!
//! Runs the whole car lifecycle inside one process: every party from the
//! network file gets its own key store, vault and responder loop on an
//! in-memory network, and the bank issues a car and then moves it.
//!
//! With a data directory each party's vault is a sled database under
//! `<data_dir>/<role>`; otherwise everything is in memory.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

use accord_protocol::flows::{
    change, issue, CarOutputsOnly, ChangeRequest, FlowContext, IssueRequest, ResponderService,
};
use accord_protocol::identity::NetworkMap;
use accord_protocol::services::{
    InMemoryNetwork, InMemoryNotary, InMemoryVault, KeyStore, NotaryService, SledVault,
    VaultStore,
};
use accord_protocol::state::StateRef;
use accord_protocol::transaction::FinalizedTransaction;

use crate::metrics::FlowMetrics;
use crate::network::{NetworkFile, Role};

/// How long to wait for counterparties to store a finalized transaction
/// before reporting on their vaults.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub data_dir: Option<PathBuf>,
    pub vin: String,
    pub plate: String,
    pub new_location: String,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            vin: "KMHD841CBLU123456".into(),
            plate: "ABC1234".into(),
            new_location: "Seoul".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct TransactionSummary {
    pub txid: String,
    pub command: String,
    pub notary: String,
    pub sequence: u64,
    pub signers: Vec<String>,
    pub consumed: Vec<String>,
    pub outputs: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct VaultSummary {
    pub party: String,
    pub unspent: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub issued: TransactionSummary,
    pub changed: TransactionSummary,
    pub vaults: Vec<VaultSummary>,
}

fn summarize(tx: &FinalizedTransaction, map: &NetworkMap) -> Result<TransactionSummary> {
    let proposal = tx.signed.proposal();
    let signers = tx
        .signed
        .signers()
        .iter()
        .map(|key| {
            map.party_for_key(key)
                .map(|p| p.name.clone())
                .unwrap_or_else(|_| key.short())
        })
        .collect();
    let outputs = proposal
        .outputs()
        .iter()
        .map(|s| serde_json::to_value(s.data()))
        .collect::<Result<_, _>>()
        .context("failed to render output state")?;
    Ok(TransactionSummary {
        txid: tx.id().to_hex(),
        command: proposal
            .commands()
            .iter()
            .map(|c| c.kind.to_string())
            .collect::<Vec<_>>()
            .join(","),
        notary: tx.attestation.notary.name.clone(),
        sequence: tx.attestation.sequence,
        signers,
        consumed: tx.attestation.consumed.iter().map(|r| r.to_string()).collect(),
        outputs,
    })
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

struct DemoNode {
    role: Role,
    ctx: FlowContext,
}

fn open_vault(options: &DemoOptions, role: Role) -> Result<Arc<dyn VaultStore>> {
    match &options.data_dir {
        Some(dir) => {
            let path = dir.join(format!("{:?}", role).to_lowercase());
            let vault = SledVault::open(&path)
                .with_context(|| format!("failed to open vault at {}", path.display()))?;
            info!(path = %path.display(), "vault opened");
            Ok(Arc::new(vault))
        }
        None => Ok(Arc::new(InMemoryVault::new())),
    }
}

async fn wait_until_stored(nodes: &[DemoNode], state: StateRef) -> Result<()> {
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
    for node in nodes {
        while node.ctx.vault.lookup_unspent(&state).await.is_err() {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("{} did not store {} in time", node.ctx.identity, state);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
    Ok(())
}

/// Issue a car from the bank, then move it to `options.new_location`.
pub async fn run(
    network: &NetworkFile,
    options: &DemoOptions,
    metrics: &FlowMetrics,
) -> Result<DemoReport> {
    let map = Arc::new(network.network_map()?);
    let notary_entry = network.entry(Role::Notary)?;
    let notary = Arc::new(InMemoryNotary::new(
        notary_entry.name.clone(),
        notary_entry.keypair()?,
    ));
    info!(notary = %notary.identity(), "notary ready");

    let net = InMemoryNetwork::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut nodes = Vec::new();
    for role in [Role::Bank, Role::Dealer, Role::Manufacturer] {
        let entry = network.entry(role)?;
        let party = entry.party()?;
        let (messaging, inbox) = net.register(party.clone());
        let ctx = FlowContext {
            identity: party,
            signer: Arc::new(KeyStore::with_key(entry.keypair()?)),
            messaging: Arc::new(messaging),
            notary: notary.clone(),
            vault: open_vault(options, role)?,
            network_map: map.clone(),
            config: network.flow.clone(),
        };
        // Every node in this network exists to sign for cars and nothing else.
        ResponderService::new(ctx.clone())
            .with_policy(Arc::new(CarOutputsOnly))
            .spawn(inbox, shutdown_rx.clone());
        nodes.push(DemoNode { role, ctx });
    }

    let find = |role: Role| {
        nodes
            .iter()
            .find(|n| n.role == role)
            .map(|n| &n.ctx)
            .with_context(|| format!("no {:?} node", role))
    };
    let bank = find(Role::Bank)?;

    let request = IssueRequest {
        holding_dealer: find(Role::Dealer)?.identity.clone(),
        manufacturer: find(Role::Manufacturer)?.identity.clone(),
        vin: options.vin.clone(),
        license_plate_number: options.plate.clone(),
        make: "Hanul".into(),
        model: "Aurora".into(),
        dealership_location: "Busan".into(),
    };
    let issued = metrics
        .observe("issue", issue(bank, request))
        .await
        .context("issue flow failed")?;
    let car = issued
        .signed
        .proposal()
        .output_refs()
        .into_iter()
        .next()
        .context("issue produced no output")?;
    wait_until_stored(&nodes, car.reference).await?;
    info!(txid = %issued.id(), state = %car.reference, "car issued");

    let mut move_car = ChangeRequest::new(car.state.linear_id().clone());
    move_car.dealership_location = Some(options.new_location.clone());
    let changed = metrics
        .observe("change", change(bank, move_car))
        .await
        .context("change flow failed")?;
    let moved = changed
        .signed
        .proposal()
        .output_refs()
        .into_iter()
        .next()
        .context("change produced no output")?;
    wait_until_stored(&nodes, moved.reference).await?;
    info!(txid = %changed.id(), state = %moved.reference, "car moved");

    let mut vaults = Vec::new();
    for node in &nodes {
        let unspent = node
            .ctx
            .vault
            .unspent_states()
            .await?
            .iter()
            .map(|s| s.reference.to_string())
            .collect();
        vaults.push(VaultSummary {
            party: node.ctx.identity.name.clone(),
            unspent,
        });
    }

    let _ = shutdown_tx.send(true);
    Ok(DemoReport {
        issued: summarize(&issued, &map)?,
        changed: summarize(&changed, &map)?,
        vaults,
    })
}
