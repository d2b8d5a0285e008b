//! Commands: the tagged intent attached to every proposal.
//!
//! A command says which rule set applies ([`CommandKind`]) and whose
//! signatures that rule set demands. The contract reads the kind; the
//! signature collection protocol reads the signer list.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::keys::PartyPublicKey;
use crate::encoding::CanonicalWriter;
use crate::identity::Party;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

/// Discriminant for the rule set a transaction is checked against.
///
/// Adding a variant here is a compile error in the contract until a handler
/// for it exists, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Create a brand-new state lineage.
    Issue,
    /// Consume one state and produce its successor.
    Change,
}

impl CommandKind {
    /// Stable wire tag. Never reuse a retired value.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Issue => 1,
            Self::Change => 2,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => write!(f, "Issue"),
            Self::Change => write!(f, "Change"),
        }
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// A command plus the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub signers: Vec<PartyPublicKey>,
}

impl Command {
    pub fn new(kind: CommandKind, signers: Vec<PartyPublicKey>) -> Self {
        Self { kind, signers }
    }

    /// Command whose required signers are the given parties' keys.
    pub fn for_parties<'a, I>(kind: CommandKind, parties: I) -> Self
    where
        I: IntoIterator<Item = &'a Party>,
    {
        let mut signers: Vec<PartyPublicKey> =
            parties.into_iter().map(|p| p.owning_key.clone()).collect();
        signers.sort();
        signers.dedup();
        Self { kind, signers }
    }

    /// Signers are a set: encoded sorted and deduplicated.
    pub(crate) fn write_canonical(&self, w: &mut CanonicalWriter) {
        let mut keys: Vec<&PartyPublicKey> = self.signers.iter().collect();
        keys.sort();
        keys.dedup();
        w.put_u8(self.kind.tag()).put_len(keys.len());
        for k in keys {
            w.put_fixed(k.as_bytes());
        }
    }
}
