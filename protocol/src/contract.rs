//! # Car Contract
//!
//! The rules every party runs, independently, before it signs anything.
//!
//! [`verify`] is a pure function of the proposal: no clock, no vault, no
//! network. Two honest nodes given the same proposal reach the same verdict,
//! which is the only reason counterparties can trust each other's signatures
//! at all. A counterparty never takes the initiator's word for it; it calls
//! `verify` again on what it received.
//!
//! ## Rules
//!
//! | Command  | Inputs | Outputs | Extra                                          |
//! |----------|--------|---------|------------------------------------------------|
//! | `Issue`  | 0      | 1       | output is a car, plate is exactly 7 characters |
//! | `Change` | 1      | 1       | same state type, same linear id, plate rule if a car |
//!
//! Dispatch is an exhaustive `match` on [`CommandKind`]. A new command kind
//! does not compile until it has a handler here.

use thiserror::Error;
use tracing::debug;

use crate::config::LICENSE_PLATE_LENGTH;
use crate::state::{LedgerState, StateData, UniqueIdentifier};
use crate::transaction::{Command, CommandKind, TransactionProposal};

/// Name of this rule set, for logs.
pub const CONTRACT_ID: &str = "accord.contracts.CarContract";

const CAR_STATE: &str = "CarState";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a proposal breaks the contract.
///
/// Violations are local and deterministic. They are never sent over the
/// wire as-is; a counterparty that rejects only says so in prose.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("transaction carries no command")]
    NoCommand,

    #[error("transaction carries {count} commands, exactly one is allowed")]
    MultipleCommands { count: usize },

    #[error("expected {expected} input state(s), found {actual}")]
    WrongInputCount { expected: usize, actual: usize },

    #[error("expected {expected} output state(s), found {actual}")]
    WrongOutputCount { expected: usize, actual: usize },

    #[error("expected output of type {expected}, found {actual}")]
    WrongOutputType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{field} must be {expected} characters, found {actual}")]
    InvalidFieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The output does not continue the input's lineage.
    #[error("output {output} does not succeed input {input}")]
    LineageMismatch {
        input: UniqueIdentifier,
        output: UniqueIdentifier,
    },

    /// A state's participant list is not the set of parties its payload
    /// names. Every such party must be told about the state.
    #[error("participants of state {linear_id} do not match the parties it names")]
    ParticipantMismatch { linear_id: UniqueIdentifier },

    /// Kept for callers that dispatch on something other than
    /// [`CommandKind`]; [`verify`] itself can never return it.
    #[error("unrecognised command")]
    UnrecognizedCommand,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Check a proposal against the car contract.
pub fn verify(tx: &TransactionProposal) -> Result<(), ContractViolation> {
    let command = single_command(tx.commands())?;
    let result = check_participants(tx).and_then(|()| match command.kind {
        CommandKind::Issue => verify_issue(tx),
        CommandKind::Change => verify_change(tx),
    });
    debug!(
        contract = CONTRACT_ID,
        command = %command.kind,
        accepted = result.is_ok(),
        "contract verification"
    );
    result
}

fn single_command(commands: &[Command]) -> Result<&Command, ContractViolation> {
    match commands {
        [] => Err(ContractViolation::NoCommand),
        [only] => Ok(only),
        many => Err(ContractViolation::MultipleCommands { count: many.len() }),
    }
}

// ---------------------------------------------------------------------------
// Issue
// ---------------------------------------------------------------------------

fn verify_issue(tx: &TransactionProposal) -> Result<(), ContractViolation> {
    expect_inputs(tx, 0)?;
    expect_outputs(tx, 1)?;

    let output = &tx.outputs()[0];
    match output.data() {
        StateData::Car(_) => check_plate(output),
        other => Err(ContractViolation::WrongOutputType {
            expected: CAR_STATE,
            actual: other.type_name(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

fn verify_change(tx: &TransactionProposal) -> Result<(), ContractViolation> {
    expect_inputs(tx, 1)?;
    expect_outputs(tx, 1)?;

    let input = &tx.inputs()[0].state;
    let output = &tx.outputs()[0];

    let (want, got) = (input.data().type_name(), output.data().type_name());
    if want != got {
        return Err(ContractViolation::WrongOutputType {
            expected: want,
            actual: got,
        });
    }

    if input.linear_id() != output.linear_id() {
        return Err(ContractViolation::LineageMismatch {
            input: input.linear_id().clone(),
            output: output.linear_id().clone(),
        });
    }

    check_plate(output)
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

fn expect_inputs(tx: &TransactionProposal, expected: usize) -> Result<(), ContractViolation> {
    let actual = tx.inputs().len();
    if actual != expected {
        return Err(ContractViolation::WrongInputCount { expected, actual });
    }
    Ok(())
}

fn expect_outputs(tx: &TransactionProposal, expected: usize) -> Result<(), ContractViolation> {
    let actual = tx.outputs().len();
    if actual != expected {
        return Err(ContractViolation::WrongOutputCount { expected, actual });
    }
    Ok(())
}

/// Every input and output must list exactly the parties its payload names.
fn check_participants(tx: &TransactionProposal) -> Result<(), ContractViolation> {
    let states = tx
        .inputs()
        .iter()
        .map(|input| &input.state)
        .chain(tx.outputs().iter());
    for state in states {
        let mut named = state.data().participants();
        named.sort();
        named.dedup();
        let mut listed = state.participants().to_vec();
        listed.sort();
        listed.dedup();
        if named != listed {
            return Err(ContractViolation::ParticipantMismatch {
                linear_id: state.linear_id().clone(),
            });
        }
    }
    Ok(())
}

/// Plate rule. A no-op for non-car states. Counts characters, not bytes.
fn check_plate(state: &LedgerState) -> Result<(), ContractViolation> {
    let Some(car) = state.data().as_car() else {
        return Ok(());
    };
    let actual = car.license_plate_number.chars().count();
    if actual != LICENSE_PLATE_LENGTH {
        return Err(ContractViolation::InvalidFieldLength {
            field: "licensePlateNumber",
            expected: LICENSE_PLATE_LENGTH,
            actual,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::double_sha256;
    use crate::crypto::keys::PartyKeypair;
    use crate::identity::Party;
    use crate::state::{CarState, StateAndRef, StateRef, TemplateState};
    use crate::transaction::TransactionBuilder;

    fn party(name: &str, seed: u8) -> Party {
        Party::new(name, PartyKeypair::from_seed(&[seed; 32]).public_key())
    }

    fn notary() -> Party {
        party("O=Notary", 9)
    }

    fn car(plate: &str) -> CarState {
        CarState {
            owning_bank: party("O=Bank", 1),
            holding_dealer: party("O=Dealer", 2),
            manufacturer: party("O=Maker", 3),
            vin: "1HGCM82633A004352".into(),
            license_plate_number: plate.into(),
            make: "Honda".into(),
            model: "Accord".into(),
            dealership_location: "Busan".into(),
        }
    }

    fn car_state(plate: &str) -> LedgerState {
        LedgerState::issue(StateData::Car(car(plate)), None)
    }

    fn cmd(kind: CommandKind, state: &LedgerState) -> Command {
        Command::for_parties(kind, state.participants())
    }

    fn issue_of(output: LedgerState) -> TransactionProposal {
        let c = cmd(CommandKind::Issue, &output);
        TransactionBuilder::new()
            .notary(notary())
            .add_output_state(output)
            .add_command(c)
            .build()
            .unwrap()
    }

    fn change_of(input: LedgerState, output: LedgerState) -> TransactionProposal {
        let c = cmd(CommandKind::Change, &output);
        TransactionBuilder::new()
            .notary(notary())
            .add_input_state(StateAndRef::new(input, StateRef::new(double_sha256(b"prior"), 0)))
            .add_output_state(output)
            .add_command(c)
            .build()
            .unwrap()
    }

    // -- Issue ---------------------------------------------------------------

    #[test]
    fn issue_with_seven_char_plate_is_accepted() {
        assert_eq!(verify(&issue_of(car_state("ABC1234"))), Ok(()));
    }

    #[test]
    fn issue_with_four_char_plate_is_rejected() {
        assert_eq!(
            verify(&issue_of(car_state("AB12"))),
            Err(ContractViolation::InvalidFieldLength {
                field: "licensePlateNumber",
                expected: 7,
                actual: 4,
            })
        );
    }

    #[test]
    fn plate_length_counts_characters_not_bytes() {
        // Seven characters, more than seven bytes.
        assert_eq!(verify(&issue_of(car_state("가나다1234"))), Ok(()));
    }

    #[test]
    fn issue_with_an_input_is_rejected() {
        let s = car_state("ABC1234");
        let tx = change_of(s.clone(), s);
        // Re-label the command as Issue.
        let c = Command::new(CommandKind::Issue, tx.commands()[0].signers.clone());
        let tx = TransactionBuilder::new()
            .notary(notary())
            .add_input_state(tx.inputs()[0].clone())
            .add_output_state(tx.outputs()[0].clone())
            .add_command(c)
            .build()
            .unwrap();
        assert_eq!(
            verify(&tx),
            Err(ContractViolation::WrongInputCount {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn issue_with_two_outputs_is_rejected() {
        let a = car_state("ABC1234");
        let tx = TransactionBuilder::new()
            .notary(notary())
            .add_output_state(a.clone())
            .add_output_state(car_state("XYZ9876"))
            .add_command(cmd(CommandKind::Issue, &a))
            .build()
            .unwrap();
        assert_eq!(
            verify(&tx),
            Err(ContractViolation::WrongOutputCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn issue_of_a_non_car_is_rejected() {
        let note = LedgerState::issue(
            StateData::Template(TemplateState {
                owner: party("O=Bank", 1),
                message: "not a car".into(),
            }),
            None,
        );
        assert_eq!(
            verify(&issue_of(note)),
            Err(ContractViolation::WrongOutputType {
                expected: "CarState",
                actual: "TemplateState",
            })
        );
    }

    // -- Command selection --------------------------------------------------

    #[test]
    fn no_command_is_rejected() {
        let tx = TransactionBuilder::new()
            .notary(notary())
            .add_output_state(car_state("ABC1234"))
            .build()
            .unwrap();
        assert_eq!(verify(&tx), Err(ContractViolation::NoCommand));
    }

    #[test]
    fn two_commands_are_rejected() {
        let s = car_state("ABC1234");
        let tx = TransactionBuilder::new()
            .notary(notary())
            .add_output_state(s.clone())
            .add_command(cmd(CommandKind::Issue, &s))
            .add_command(cmd(CommandKind::Issue, &s))
            .build()
            .unwrap();
        assert_eq!(verify(&tx), Err(ContractViolation::MultipleCommands { count: 2 }));
    }

    // -- Change --------------------------------------------------------------

    #[test]
    fn change_keeping_lineage_is_accepted() {
        let prior = car_state("ABC1234");
        let next = prior.successor(StateData::Car(CarState {
            dealership_location: "Seoul".into(),
            ..car("ABC1234")
        }));
        assert_eq!(verify(&change_of(prior, next)), Ok(()));
    }

    #[test]
    fn change_to_a_new_lineage_is_rejected() {
        let prior = car_state("ABC1234");
        let unrelated = car_state("ABC1234");
        assert!(matches!(
            verify(&change_of(prior, unrelated)),
            Err(ContractViolation::LineageMismatch { .. })
        ));
    }

    #[test]
    fn change_cannot_produce_an_invalid_plate() {
        let prior = car_state("ABC1234");
        let next = prior.successor(StateData::Car(car("TOO-LONG-1")));
        assert_eq!(
            verify(&change_of(prior, next)),
            Err(ContractViolation::InvalidFieldLength {
                field: "licensePlateNumber",
                expected: 7,
                actual: 10,
            })
        );
    }

    #[test]
    fn change_cannot_switch_state_type() {
        let prior = car_state("ABC1234");
        let next = prior.successor(StateData::Template(TemplateState {
            owner: party("O=Bank", 1),
            message: "was a car".into(),
        }));
        assert_eq!(
            verify(&change_of(prior, next)),
            Err(ContractViolation::WrongOutputType {
                expected: "CarState",
                actual: "TemplateState",
            })
        );
    }

    #[test]
    fn change_without_input_is_rejected() {
        let s = car_state("ABC1234");
        let tx = TransactionBuilder::new()
            .notary(notary())
            .add_output_state(s.clone())
            .add_command(cmd(CommandKind::Change, &s))
            .build()
            .unwrap();
        assert_eq!(
            verify(&tx),
            Err(ContractViolation::WrongInputCount {
                expected: 1,
                actual: 0
            })
        );
    }

    // -- Participants --------------------------------------------------------

    #[test]
    fn output_missing_a_named_party_is_rejected() {
        let partial = LedgerState::from_parts(
            UniqueIdentifier::new(None),
            vec![party("O=Bank", 1)],
            StateData::Car(car("ABC1234")),
        );
        let id = partial.linear_id().clone();
        assert_eq!(
            verify(&issue_of(partial)),
            Err(ContractViolation::ParticipantMismatch { linear_id: id })
        );
    }

    #[test]
    fn output_with_an_extra_party_is_rejected() {
        let padded = LedgerState::from_parts(
            UniqueIdentifier::new(None),
            vec![
                party("O=Bank", 1),
                party("O=Dealer", 2),
                party("O=Maker", 3),
                party("O=Stranger", 7),
            ],
            StateData::Car(car("ABC1234")),
        );
        assert!(matches!(
            verify(&issue_of(padded)),
            Err(ContractViolation::ParticipantMismatch { .. })
        ));
    }

    #[test]
    fn change_of_a_mislabelled_input_is_rejected() {
        let good = car_state("ABC1234");
        let bad_input = LedgerState::from_parts(
            good.linear_id().clone(),
            vec![party("O=Bank", 1), party("O=Dealer", 2)],
            StateData::Car(car("ABC1234")),
        );
        assert!(matches!(
            verify(&change_of(bad_input, good)),
            Err(ContractViolation::ParticipantMismatch { .. })
        ));
    }

    // -- Determinism ---------------------------------------------------------

    #[test]
    fn verification_is_deterministic() {
        let proposals = [
            issue_of(car_state("ABC1234")),
            issue_of(car_state("AB12")),
            change_of(car_state("ABC1234"), car_state("ABC1234")),
        ];
        for p in &proposals {
            assert_eq!(verify(p), verify(p));
        }
    }
}
