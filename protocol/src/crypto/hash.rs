//! # Hashing Utilities
//!
//! Two hash functions, each with a job:
//!
//! - **SHA-256** (doubled) names transactions. `txid = SHA-256(SHA-256(canonical_bytes))`.
//! - **BLAKE3** in derive-key mode produces domain-separated digests, used for
//!   the notary attestation payload so that an attestation signature can never
//!   be confused with a transaction signature.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte digest with a hex display. Used as the transaction id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecureHash([u8; 32]);

impl SecureHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.as_slice().try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash({})", &self.to_hex()[..16])
    }
}

/// SHA-256 of `data`.
///
/// # Example
///
/// ```
/// use accord_protocol::crypto::sha256;
///
/// assert_eq!(sha256(b"accord").len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// `SHA-256(SHA-256(data))`, the transaction id construction.
pub fn double_sha256(data: &[u8]) -> SecureHash {
    SecureHash(sha256(&sha256(data)))
}

/// BLAKE3 of `data`.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 using `derive_key` mode. Same data under two
/// contexts never collides.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let hash = sha256(b"");
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn double_sha256_is_sha_of_sha() {
        let single = sha256(b"accord");
        let double = double_sha256(b"accord");
        assert_eq!(double.as_bytes(), &sha256(&single));
        assert_ne!(double.as_bytes(), &single);
    }

    #[test]
    fn test_domain_separation() {
        let data = b"same data";
        assert_ne!(
            domain_separated_hash("context-a", data),
            domain_separated_hash("context-b", data)
        );
        assert_ne!(domain_separated_hash("context-a", data), blake3_hash(data));
    }

    #[test]
    fn secure_hash_hex_roundtrip() {
        let h = double_sha256(b"tx");
        assert_eq!(SecureHash::from_hex(&h.to_hex()), Some(h));
        assert_eq!(SecureHash::from_hex("abc"), None);
    }
}
