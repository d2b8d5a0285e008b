//! # Cryptographic Primitives
//!
//! Thin, typed wrappers over audited implementations:
//!
//! - **Ed25519** (ed25519-dalek) for party and notary signatures.
//! - **SHA-256** (sha2) for transaction ids.
//! - **BLAKE3** for domain-separated attestation digests.
//!
//! Signing and verification are the only cryptography the core needs; key
//! custody belongs to the signing service (see [`crate::services::signing`]).

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, domain_separated_hash, double_sha256, sha256, SecureHash};
pub use keys::{KeyError, PartyKeypair, PartyPublicKey, PartySignature};
pub use signatures::{batch_verify, sign, verify, SignatureError};
