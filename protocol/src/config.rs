//! # Protocol Configuration & Constants
//!
//! Every magic number in accord lives here. If you're hardcoding a timeout
//! somewhere else, move it here and owe the team coffee.
//!
//! Two kinds of values live in this file:
//!
//! - **Consensus-critical constants** (canonical encoding version, key and
//!   signature lengths, the plate-code length rule). Every party must agree
//!   on these byte for byte or signatures stop lining up.
//! - **Operational knobs** ([`FlowConfig`]) that a node may tune locally
//!   without affecting what other parties accept.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Major version: bump on breaking changes to the canonical encoding.
pub const PROTOCOL_VERSION_MAJOR: u16 = 0;

/// Minor version: bump on backward-compatible additions.
pub const PROTOCOL_VERSION_MINOR: u16 = 1;

/// Patch version: bump on non-consensus bug fixes.
pub const PROTOCOL_VERSION_PATCH: u16 = 0;

/// The full version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version tag written at the front of every canonical transaction encoding.
/// Two nodes disagreeing on this will never produce matching signatures, which
/// is exactly what we want.
pub const CANONICAL_ENCODING_VERSION: u16 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 for every party signature and every notary attestation.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Signing key length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Hash output length in bytes (SHA-256 and BLAKE3 alike).
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// BLAKE3 derive-key context for notary attestations. Keeps an attestation
/// signature from ever being replayed as a transaction signature.
pub const ATTESTATION_DOMAIN: &str = "accord 2026 notary attestation v1";

// ---------------------------------------------------------------------------
// Contract Rules
// ---------------------------------------------------------------------------

/// Required length of a car's licence plate code, in characters.
pub const LICENSE_PLATE_LENGTH: usize = 7;

/// Maximum number of inputs a single proposal may reference.
pub const MAX_TX_INPUTS: usize = 256;

/// Maximum number of outputs a single proposal may create.
pub const MAX_TX_OUTPUTS: usize = 256;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// How long the initiator waits for a single counterparty to verify and
/// sign before the whole round is aborted.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// How long we wait for the notary to attest. A notary that takes longer
/// than this is treated as unavailable.
pub const NOTARY_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a counterparty waits, after signing, for the initiator to
/// report the finality outcome.
pub const FINALITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Capacity of each in-memory session channel. Flows exchange a handful of
/// messages per session, so this only needs to absorb short bursts.
pub const SESSION_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// FlowConfig
// ---------------------------------------------------------------------------

/// Per-node flow tuning. Serializable so the node binary can load it from
/// its JSON config alongside the network map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Bounded wait for each counterparty's verify/sign reply, in milliseconds.
    pub session_timeout_ms: u64,
    /// Bounded wait for the notary attestation, in milliseconds.
    pub notary_timeout_ms: u64,
    /// Bounded wait on the responder side for the finality outcome, in milliseconds.
    pub finality_timeout_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_timeout_ms: SESSION_TIMEOUT.as_millis() as u64,
            notary_timeout_ms: NOTARY_TIMEOUT.as_millis() as u64,
            finality_timeout_ms: FINALITY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl FlowConfig {
    /// Uniform timeouts, handy for tests that want failures to show up fast.
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            session_timeout_ms: timeout_ms,
            notary_timeout_ms: timeout_ms,
            finality_timeout_ms: timeout_ms,
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn notary_timeout(&self) -> Duration {
        Duration::from_millis(self.notary_timeout_ms)
    }

    pub fn finality_timeout(&self) -> Duration {
        Duration::from_millis(self.finality_timeout_ms)
    }
}
