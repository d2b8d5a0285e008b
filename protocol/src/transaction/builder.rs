//! Proposal construction via the builder pattern.
//!
//! The [`TransactionBuilder`] collects inputs, outputs, commands and a
//! notary, then `.build()` hands back an immutable [`TransactionProposal`]
//! with a deterministic id derived from its canonical bytes.
//!
//! The builder does not verify contract rules and does not sign. Rules live
//! in [`crate::contract`], signatures in [`super::signing`]. Building only
//! refuses proposals that could never be valid no matter who checks them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::types::Command;
use crate::config::{CANONICAL_ENCODING_VERSION, MAX_TX_INPUTS, MAX_TX_OUTPUTS};
use crate::crypto::hash::{double_sha256, SecureHash};
use crate::crypto::keys::PartyPublicKey;
use crate::encoding::CanonicalWriter;
use crate::identity::Party;
use crate::state::{LedgerState, StateAndRef, StateRef};

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

/// Reasons a proposal cannot be assembled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Output `index` lists nobody. Such a state could never be signed for
    /// or consumed later.
    #[error("output state {index} has an empty participant set")]
    EmptyParticipantSet { index: usize },

    /// Every proposal names the notary that will order it.
    #[error("no notary set on the proposal")]
    MissingNotary,

    #[error("too many inputs: {count} (max {max})")]
    TooManyInputs { count: usize, max: usize },

    #[error("too many outputs: {count} (max {max})")]
    TooManyOutputs { count: usize, max: usize },
}

// ---------------------------------------------------------------------------
// TransactionProposal
// ---------------------------------------------------------------------------

/// An unsigned candidate transaction.
///
/// Fields are private and there is no way to mutate a proposal after
/// `build()`. Changing anything means building a new proposal, which gets a
/// new id, which invalidates every signature over the old one.
///
/// # Canonical Byte Format
///
/// ```text
/// version:u16
/// inputs:  len:u32 { txhash:[32] index:u32 state }*      (in order)
/// outputs: len:u32 { state }*                            (in order)
/// commands:len:u32 { tag:u8 signers:len:u32 [32]* }*
/// notary:  len:u32 name key:[32]
/// ```
///
/// Input and output order is significant: swapping two inputs changes the
/// signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProposal {
    version: u16,
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    notary: Party,
}

impl TransactionProposal {
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Resolved input states, each with the reference being consumed.
    pub fn inputs(&self) -> &[StateAndRef] {
        &self.inputs
    }

    pub fn input_refs(&self) -> Vec<StateRef> {
        self.inputs.iter().map(|i| i.reference).collect()
    }

    pub fn outputs(&self) -> &[LedgerState] {
        &self.outputs
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn notary(&self) -> &Party {
        &self.notary
    }

    /// The exact bytes every party signs.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut w = CanonicalWriter::with_capacity(1024);
        w.put_u16(self.version);

        w.put_len(self.inputs.len());
        for input in &self.inputs {
            input.write_canonical(&mut w);
        }

        w.put_len(self.outputs.len());
        for output in &self.outputs {
            output.write_canonical(&mut w);
        }

        w.put_len(self.commands.len());
        for cmd in &self.commands {
            cmd.write_canonical(&mut w);
        }

        w.put_bytes(&self.notary.canonical_bytes());
        w.finish()
    }

    /// Transaction id: `double_sha256(canonical_bytes)`.
    pub fn id(&self) -> SecureHash {
        double_sha256(&self.canonical_bytes())
    }

    /// Every key that must sign: all command signers plus every participant
    /// of every input and output state.
    pub fn required_signers(&self) -> BTreeSet<PartyPublicKey> {
        let mut keys = BTreeSet::new();
        for cmd in &self.commands {
            keys.extend(cmd.signers.iter().cloned());
        }
        let states = self
            .inputs
            .iter()
            .map(|i| &i.state)
            .chain(self.outputs.iter());
        for state in states {
            keys.extend(state.participants().iter().map(|p| p.owning_key.clone()));
        }
        keys
    }

    /// Every party named as a participant on an input or output, deduplicated.
    /// Used to decide who receives the finalized result.
    pub fn participants(&self) -> BTreeSet<Party> {
        self.inputs
            .iter()
            .map(|i| &i.state)
            .chain(self.outputs.iter())
            .flat_map(|s| s.participants().iter().cloned())
            .collect()
    }

    /// References of the outputs this proposal creates once finalized.
    pub fn output_refs(&self) -> Vec<StateAndRef> {
        let id = self.id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(i, s)| StateAndRef::new(s.clone(), StateRef::new(id, i as u32)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`TransactionProposal`].
///
/// ```rust,no_run
/// use accord_protocol::transaction::{Command, CommandKind, TransactionBuilder};
/// # use accord_protocol::identity::Party;
/// # use accord_protocol::state::LedgerState;
/// # fn demo(notary: Party, car: LedgerState) {
/// let cmd = Command::for_parties(CommandKind::Issue, car.participants());
/// let proposal = TransactionBuilder::new()
///     .notary(notary)
///     .add_output_state(car)
///     .add_command(cmd)
///     .build()
///     .expect("well-formed");
/// # }
/// ```
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<StateAndRef>,
    outputs: Vec<LedgerState>,
    commands: Vec<Command>,
    notary: Option<Party>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notary(mut self, notary: Party) -> Self {
        self.notary = Some(notary);
        self
    }

    /// Appends an input. Order of calls is the order in the proposal.
    pub fn add_input_state(mut self, input: StateAndRef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output_state(mut self, output: LedgerState) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn add_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Consumes the builder. Command count is deliberately not checked here;
    /// that is a contract rule and must be reported as one.
    pub fn build(self) -> Result<TransactionProposal, BuildError> {
        let notary = self.notary.ok_or(BuildError::MissingNotary)?;

        if self.inputs.len() > MAX_TX_INPUTS {
            return Err(BuildError::TooManyInputs {
                count: self.inputs.len(),
                max: MAX_TX_INPUTS,
            });
        }
        if self.outputs.len() > MAX_TX_OUTPUTS {
            return Err(BuildError::TooManyOutputs {
                count: self.outputs.len(),
                max: MAX_TX_OUTPUTS,
            });
        }
        if let Some(index) = self.outputs.iter().position(|s| s.participants().is_empty()) {
            return Err(BuildError::EmptyParticipantSet { index });
        }

        Ok(TransactionProposal {
            version: CANONICAL_ENCODING_VERSION,
            inputs: self.inputs,
            outputs: self.outputs,
            commands: self.commands,
            notary,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
