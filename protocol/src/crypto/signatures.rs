//! # Digital Signatures
//!
//! Free-function wrappers over the key types, plus a batch check used when a
//! whole signature map has to be validated against one payload.
//!
//! Every party signs the same bytes: the proposal's canonical encoding. The
//! batch check therefore takes one message and many `(key, signature)` pairs.

use thiserror::Error;

use super::keys::{PartyKeypair, PartyPublicKey, PartySignature};

/// Errors during signature checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature does not verify for this key over the shared payload.
    #[error("signature verification failed for {0}")]
    VerificationFailed(PartyPublicKey),
}

/// Sign a message with a party keypair.
///
/// # Example
///
/// ```
/// use accord_protocol::crypto::{sign, verify, PartyKeypair};
///
/// let keypair = PartyKeypair::generate();
/// let signature = sign(&keypair, b"proposal bytes");
/// assert!(verify(&keypair.public_key(), b"proposal bytes", &signature));
/// ```
pub fn sign(keypair: &PartyKeypair, message: &[u8]) -> PartySignature {
    keypair.sign(message)
}

/// Verify a signature against a public key and message.
pub fn verify(public_key: &PartyPublicKey, message: &[u8], signature: &PartySignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify many signatures over the same message.
///
/// Stops at the first bad one and names its key, so flows can report which
/// party's signature was rejected.
pub fn batch_verify<'a, I>(message: &[u8], items: I) -> Result<(), SignatureError>
where
    I: IntoIterator<Item = (&'a PartyPublicKey, &'a PartySignature)>,
{
    for (key, signature) in items {
        if !verify(key, message, signature) {
            return Err(SignatureError::VerificationFailed(key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let kp = PartyKeypair::generate();
        let sig = sign(&kp, b"hello");
        assert!(verify(&kp.public_key(), b"hello", &sig));
    }

    #[test]
    fn test_deterministic_signatures() {
        let kp = PartyKeypair::generate();
        assert_eq!(sign(&kp, b"same"), sign(&kp, b"same"));
    }

    #[test]
    fn batch_verify_names_the_bad_signer() {
        let a = PartyKeypair::generate();
        let b = PartyKeypair::generate();
        let msg = b"payload";
        let good = sign(&a, msg);
        let bad = sign(&b, b"some other payload");
        let (ka, kb) = (a.public_key(), b.public_key());

        assert!(batch_verify(msg, [(&ka, &good)]).is_ok());
        assert_eq!(
            batch_verify(msg, [(&ka, &good), (&kb, &bad)]),
            Err(SignatureError::VerificationFailed(kb.clone()))
        );
    }

    #[test]
    fn batch_verify_empty_is_ok() {
        let empty: Vec<(&PartyPublicKey, &PartySignature)> = Vec::new();
        assert!(batch_verify(b"x", empty).is_ok());
    }
}
