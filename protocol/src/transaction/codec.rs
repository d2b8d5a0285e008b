//! Wire codec.
//!
//! bincode for everything that crosses a session or lands in the vault.
//! The wire form is *not* what gets signed: signatures cover
//! [`TransactionProposal::canonical_bytes`](super::TransactionProposal::canonical_bytes),
//! which is rebuilt from the decoded value. A decode that silently changed a
//! field would therefore surface as a signature failure, not a wrong answer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Upper bound on a single decoded frame. Anything bigger is garbage or an
/// attack; a car transaction is a few kilobytes.
pub const MAX_FRAME_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

fn options() -> impl bincode::Options {
    use bincode::Options;
    bincode::DefaultOptions::new()
        .with_limit(MAX_FRAME_BYTES)
        .with_fixint_encoding()
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    use bincode::Options;
    options()
        .serialize(value)
        .map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    use bincode::Options;
    options()
        .deserialize(bytes)
        .map_err(|e| CodecError::Decode(e.to_string()))
}
