//! Public signing-key provider contract.
//!
//! The public-key daemon replicates the authority service's token-signing
//! keys and exposes them to the role-token validator as verifiers keyed by
//! key ID.

use std::sync::Arc;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::daemon::Daemon;
use crate::errors::BoxError;

/// Verifies a signature over a message with one specific key.
pub trait SignatureVerifier: Send + Sync {
    /// Check `signature` over `message`.
    ///
    /// # Errors
    ///
    /// Returns an error when the signature does not verify.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), BoxError>;
}

/// Read-only view over the replicated signing keys.
///
/// Pure lookup: non-blocking and safe under concurrent reads while the
/// daemon refreshes its snapshot.
pub trait KeyProvider: Send + Sync {
    /// Look up the verifier for `key_id`, or `None` when unknown.
    fn get_key(&self, key_id: &str) -> Option<Arc<dyn SignatureVerifier>>;
}

/// Public-key refresh daemon: lifecycle plus key lookup.
pub trait KeyDaemon: Daemon + KeyProvider {}

impl<T: Daemon + KeyProvider> KeyDaemon for T {}

/// Ed25519 signature verifier.
#[derive(Debug, Clone)]
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Wrap a verifying key.
    #[must_use]
    pub const fn new(key: VerifyingKey) -> Self {
        Self { key }
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), BoxError> {
        let signature = Signature::from_slice(signature)?;
        self.key.verify(message, &signature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    #[test]
    fn test_ed25519_verifier_round_trip() {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifier = Ed25519Verifier::new(signing.verifying_key());

        let message = b"v=Z1;d=coretech;r=readers";
        let signature = signing.sign(message);

        assert!(verifier.verify(message, &signature.to_bytes()).is_ok());
        assert!(verifier.verify(b"tampered", &signature.to_bytes()).is_err());
    }
}
