//! # Key Management
//!
//! Ed25519 keypairs, public keys and signatures for accord parties.
//!
//! Every party on the ledger, and every notary, is identified by one Ed25519
//! public key. Signing a proposal means signing its canonical bytes with the
//! matching secret key; nothing else in the protocol carries authority.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek handles this).
//! - Key generation uses `OsRng`.
//! - Key bytes are never logged. Public keys are, freely.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Deliberately vague about *why* something failed. Error messages are a
/// lousy place to leak details about key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not valid hex")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// A party's signing identity: an Ed25519 signing key.
///
/// `PartyKeypair` intentionally does NOT implement `Serialize`. Writing a
/// secret key somewhere should be a conscious act through
/// [`secret_key_bytes`](Self::secret_key_bytes), not a side effect of
/// dumping a struct to JSON.
///
/// # Examples
///
/// ```
/// use accord_protocol::crypto::keys::PartyKeypair;
///
/// let kp = PartyKeypair::generate();
/// let sig = kp.sign(b"issue car ABC1234");
/// assert!(kp.public_key().verify(b"issue car ABC1234", &sig));
/// ```
pub struct PartyKeypair {
    signing_key: SigningKey,
}

/// The public half of a party identity. Safe to share, log and put on the wire.
///
/// Ordered by raw bytes so it can key a `BTreeMap`; the signature map of a
/// transaction relies on that for a deterministic encoding.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature. Stored as `Vec<u8>` for serde, always 64 bytes when
/// produced by us; anything else simply fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySignature {
    bytes: Vec<u8>,
}

impl PartyKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Tests and demos use this
    /// to get stable identities; production keys should come from `generate`.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Reconstruct a keypair from a hex-encoded secret key (as written by
    /// `accord-node init`).
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&arr))
    }

    pub fn public_key(&self) -> PartyPublicKey {
        PartyPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message. Ed25519 is deterministic: same key, same message,
    /// same signature.
    pub fn sign(&self, message: &[u8]) -> PartySignature {
        PartySignature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Export the raw secret key. Handle with care.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }
}

impl Clone for PartyKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PartyKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret half.
        write!(f, "PartyKeypair({:?})", self.public_key())
    }
}

// ---------------------------------------------------------------------------
// PartyPublicKey
// ---------------------------------------------------------------------------

impl PartyPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Parse a public key from a slice, rejecting anything that is not a
    /// valid Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature over `message`. A boolean, not a `Result`: callers
    /// only ever want yes or no, and a detailed failure reason is an oracle.
    pub fn verify(&self, message: &[u8], signature: &PartySignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }

    /// First eight hex characters. Enough to tell parties apart in logs.
    pub fn short(&self) -> String {
        hex::encode(&self.bytes[..4])
    }
}

impl fmt::Display for PartyPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PartyPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyPublicKey({})", self.short())
    }
}

// ---------------------------------------------------------------------------
// PartySignature
// ---------------------------------------------------------------------------

impl PartySignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// `None` if the stored bytes are not exactly 64 long.
    pub fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; 64] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Display for PartySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PartySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "PartySignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "PartySignature({})", hex_str)
        }
    }
}
