//! JSON Web Key provider contract.
//!
//! The JWK daemon replicates the authority service's JWK sets; the
//! access-token validator resolves the token header's `kid` through it.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::daemon::Daemon;

/// One replicated JWK, ready for signature verification.
#[derive(Clone)]
pub struct JsonWebKey {
    /// Signature algorithm the key is registered for.
    pub algorithm: Algorithm,

    /// Decoding key derived from the JWK parameters.
    pub key: DecodingKey,
}

impl std::fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // DecodingKey is opaque (and secret for symmetric keys).
        f.debug_struct("JsonWebKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Read-only view over the replicated JWK sets.
pub trait JwkProvider: Send + Sync {
    /// Look up the key for `kid`, or `None` when unknown.
    fn get_key(&self, kid: &str) -> Option<Arc<JsonWebKey>>;
}

/// JWK refresh daemon: lifecycle plus key lookup.
pub trait JwkDaemon: Daemon + JwkProvider {}

impl<T: Daemon + JwkProvider> JwkDaemon for T {}
