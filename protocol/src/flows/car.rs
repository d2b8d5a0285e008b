//! Car flows: the entry points a node exposes to its operators.
//!
//! Both follow the same shape: build a proposal, collect signatures from
//! bank, dealer and manufacturer, notarise, distribute. The initiator is
//! always the owning bank.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::context::FlowContext;
use super::error::FlowError;
use super::execute;
use crate::contract::ContractViolation;
use crate::identity::Party;
use crate::state::{CarState, LedgerState, StateData, UniqueIdentifier};
use crate::transaction::{Command, CommandKind, FinalizedTransaction, TransactionBuilder};

/// Fields of a brand-new car. The initiating node is the owning bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub holding_dealer: Party,
    pub manufacturer: Party,
    pub vin: String,
    pub license_plate_number: String,
    pub make: String,
    pub model: String,
    pub dealership_location: String,
}

/// Changes to an existing car, named by its linear id. `None` keeps the
/// current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub linear_id: UniqueIdentifier,
    pub holding_dealer: Option<Party>,
    pub dealership_location: Option<String>,
    pub license_plate_number: Option<String>,
}

impl ChangeRequest {
    pub fn new(linear_id: UniqueIdentifier) -> Self {
        Self {
            linear_id,
            ..Default::default()
        }
    }
}

/// Issue a new car onto the ledger.
pub async fn issue(
    ctx: &FlowContext,
    request: IssueRequest,
) -> Result<FinalizedTransaction, FlowError> {
    let notary = ctx.network_map.default_notary()?.clone();
    let car = CarState {
        owning_bank: ctx.identity.clone(),
        holding_dealer: request.holding_dealer,
        manufacturer: request.manufacturer,
        vin: request.vin,
        license_plate_number: request.license_plate_number,
        make: request.make,
        model: request.model,
        dealership_location: request.dealership_location,
    };
    let external_id = Some(car.vin.clone());
    let output = LedgerState::issue(StateData::Car(car), external_id);
    let command = Command::for_parties(CommandKind::Issue, output.participants());
    info!(linear_id = %output.linear_id(), "issue flow started");

    let proposal = TransactionBuilder::new()
        .notary(notary)
        .add_output_state(output)
        .add_command(command)
        .build()?;
    execute(ctx, proposal).await
}

/// Move an existing car to its next version.
pub async fn change(
    ctx: &FlowContext,
    request: ChangeRequest,
) -> Result<FinalizedTransaction, FlowError> {
    let prior = ctx
        .vault
        .unspent_by_linear_id(&request.linear_id)
        .await?
        .ok_or_else(|| FlowError::StateNotFound(request.linear_id.clone()))?;

    let current = prior
        .state
        .data()
        .as_car()
        .ok_or(ContractViolation::WrongOutputType {
            expected: "CarState",
            actual: prior.state.data().type_name(),
        })?
        .clone();

    let next = CarState {
        holding_dealer: request.holding_dealer.unwrap_or(current.holding_dealer),
        dealership_location: request
            .dealership_location
            .unwrap_or(current.dealership_location),
        license_plate_number: request
            .license_plate_number
            .unwrap_or(current.license_plate_number),
        ..current
    };
    let output = prior.state.successor(StateData::Car(next));

    // Outgoing and incoming participants both sign.
    let signers = prior
        .state
        .participants()
        .iter()
        .chain(output.participants().iter());
    let command = Command::for_parties(CommandKind::Change, signers);
    info!(linear_id = %output.linear_id(), input = %prior.reference, "change flow started");

    let proposal = TransactionBuilder::new()
        .notary(ctx.network_map.default_notary()?.clone())
        .add_input_state(prior)
        .add_output_state(output)
        .add_command(command)
        .build()?;
    execute(ctx, proposal).await
}
