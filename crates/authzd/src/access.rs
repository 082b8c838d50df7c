//! Access-token (JWT) parsing and validation.
//!
//! Access tokens are JWTs signed by the authority service: the domain is
//! the `aud` claim, roles are the `scp` claim, and an optional
//! `cnf.x5t#S256` claim binds the token to the mTLS client certificate it
//! was issued against. Signature keys are resolved by `kid` through the
//! replicated JWK sets.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::cert::PeerCertificate;
use crate::errors::BoxError;
use crate::jwk::JwkProvider;

/// Access-token modality configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenParam {
    /// Enable the access-token modality.
    #[serde(default)]
    pub enable: bool,

    /// Require the `cnf.x5t#S256` claim to match the client certificate's
    /// SHA-256 thumbprint.
    #[serde(default = "default_true")]
    pub verify_cert_thumbprint: bool,

    /// Require the `client_id` claim to be allow-listed and the client
    /// certificate's subject CN to be registered for it.
    #[serde(default)]
    pub verify_client_id: bool,

    /// Allowed subject CNs per client ID.
    #[serde(default)]
    pub authorized_client_ids: HashMap<String, Vec<String>>,

    /// How far before the token's issue time the bound certificate may
    /// have been issued during the rotation grace window.
    #[serde(default = "default_grace")]
    #[serde(with = "humantime_serde")]
    pub cert_backdate_dur: Duration,

    /// How far from the token's issue time the current time may lie during
    /// the rotation grace window.
    #[serde(default = "default_grace")]
    #[serde(with = "humantime_serde")]
    pub cert_offset_dur: Duration,
}

const fn default_true() -> bool {
    true
}

const fn default_grace() -> Duration {
    Duration::from_secs(3600)
}

impl Default for AccessTokenParam {
    fn default() -> Self {
        Self {
            enable: false,
            verify_cert_thumbprint: true,
            verify_client_id: false,
            authorized_client_ids: HashMap::new(),
            cert_backdate_dur: default_grace(),
            cert_offset_dur: default_grace(),
        }
    }
}

/// Validated access-token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject the token was issued to.
    pub sub: String,

    /// Audience: the policy domain.
    pub aud: String,

    /// Granted roles.
    #[serde(default, rename = "scp")]
    pub scope: Vec<String>,

    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry time, seconds since the Unix epoch.
    pub exp: i64,

    /// OAuth2 client ID.
    #[serde(default)]
    pub client_id: String,

    /// Proof-of-possession confirmation claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnf: Option<HashMap<String, serde_json::Value>>,
}

impl AccessTokenClaims {
    /// The `cnf.x5t#S256` certificate thumbprint, when present.
    #[must_use]
    pub fn bound_thumbprint(&self) -> Option<&str> {
        self.cnf.as_ref()?.get("x5t#S256")?.as_str()
    }
}

/// Parses and validates access tokens.
pub trait AccessTokenValidator: Send + Sync {
    /// Parse `token`, verify its signature and, when configured, its
    /// binding to `cert`.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is malformed, expired, signed with
    /// an unknown key, or fails certificate binding.
    fn parse_and_validate(
        &self,
        token: &str,
        cert: Option<&PeerCertificate>,
    ) -> Result<AccessTokenClaims, BoxError>;
}

/// Access-token validation failures.
#[derive(Debug, thiserror::Error)]
pub enum AccessTokenError {
    /// Certificate binding is enabled but no client certificate was given.
    #[error("error mTLS client certificate is nil")]
    NilCertificate,

    /// The token header carries no `kid`.
    #[error("access token kid missing")]
    KidMissing,

    /// No replicated JWK matches the token's `kid`.
    #[error("unknown jwk: {0}")]
    UnknownKey(String),

    /// Signature or standard-claim validation failed.
    #[error("access token invalid: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Thumbprint binding is enabled but the token has no `cnf.x5t#S256`.
    #[error("access token has no certificate thumbprint confirmation")]
    BoundThumbprintMissing,

    /// The thumbprint mismatches and the rotation grace window does not
    /// apply.
    #[error("certificate thumbprint mismatch")]
    ThumbprintMismatch,

    /// The `client_id` claim is not allow-listed.
    #[error("unauthorized client id: {0}")]
    UnauthorizedClientId(String),

    /// The certificate's subject CN is not registered for the client ID.
    #[error("unauthorized principal cn: {0}")]
    UnauthorizedPrincipalCn(String),
}

/// Validator backed by a [`JwkProvider`].
pub struct AccessTokenProcessor {
    jwks: Arc<dyn JwkProvider>,
    verify_cert_thumbprint: bool,
    verify_client_id: bool,
    authorized_client_ids: HashMap<String, Vec<String>>,
    cert_backdate_dur: Duration,
    cert_offset_dur: Duration,
}

impl AccessTokenProcessor {
    /// Create a validator resolving JWKs through `jwks`.
    #[must_use]
    pub fn new(jwks: Arc<dyn JwkProvider>, param: &AccessTokenParam) -> Self {
        Self {
            jwks,
            verify_cert_thumbprint: param.verify_cert_thumbprint,
            verify_client_id: param.verify_client_id,
            authorized_client_ids: param.authorized_client_ids.clone(),
            cert_backdate_dur: param.cert_backdate_dur,
            cert_offset_dur: param.cert_offset_dur,
        }
    }

    fn validate_bound_certificate(
        &self,
        claims: &AccessTokenClaims,
        cert: &PeerCertificate,
    ) -> Result<(), AccessTokenError> {
        let expected = claims
            .bound_thumbprint()
            .ok_or(AccessTokenError::BoundThumbprintMissing)?;
        let actual = cert.thumbprint_sha256();

        if bool::from(expected.as_bytes().ct_eq(actual.as_bytes())) {
            return Ok(());
        }

        // Thumbprint mismatch is tolerated right after a certificate
        // rotation: the certificate must have been issued near the token's
        // issue time, and the token must still be fresh.
        let now = chrono::Utc::now().timestamp();
        let backdate = self.cert_backdate_dur.as_secs() as i64;
        let offset = self.cert_offset_dur.as_secs() as i64;
        let issued_near_iat = (cert.not_before - claims.iat).abs() <= backdate;
        let still_fresh = (now - claims.iat).abs() <= offset;
        if issued_near_iat && still_fresh {
            return Ok(());
        }

        Err(AccessTokenError::ThumbprintMismatch)
    }

    fn validate_client_id(
        &self,
        claims: &AccessTokenClaims,
        cert: &PeerCertificate,
    ) -> Result<(), AccessTokenError> {
        let allowed = self
            .authorized_client_ids
            .get(&claims.client_id)
            .ok_or_else(|| AccessTokenError::UnauthorizedClientId(claims.client_id.clone()))?;
        if !allowed.contains(&cert.subject_common_name) {
            return Err(AccessTokenError::UnauthorizedPrincipalCn(
                cert.subject_common_name.clone(),
            ));
        }
        Ok(())
    }
}

impl AccessTokenValidator for AccessTokenProcessor {
    fn parse_and_validate(
        &self,
        token: &str,
        cert: Option<&PeerCertificate>,
    ) -> Result<AccessTokenClaims, BoxError> {
        let needs_cert = self.verify_cert_thumbprint || self.verify_client_id;
        if needs_cert && cert.is_none() {
            return Err(AccessTokenError::NilCertificate.into());
        }

        let header = decode_header(token).map_err(AccessTokenError::Jwt)?;
        let kid = header.kid.ok_or(AccessTokenError::KidMissing)?;
        let jwk = self
            .jwks
            .get_key(&kid)
            .ok_or(AccessTokenError::UnknownKey(kid))?;

        let mut validation = Validation::new(jwk.algorithm);
        validation.validate_aud = false;
        let claims = decode::<AccessTokenClaims>(token, &jwk.key, &validation)
            .map_err(AccessTokenError::Jwt)?
            .claims;

        if let Some(cert) = cert {
            if self.verify_cert_thumbprint {
                self.validate_bound_certificate(&claims, cert)?;
            }
            if self.verify_client_id {
                self.validate_client_id(&claims, cert)?;
            }
        }

        Ok(claims)
    }
}
