//! Role-token parsing and validation.
//!
//! Role tokens are `;`-separated `key=value` strings signed by the
//! authority service, e.g.
//! `v=Z1;d=coretech;r=readers,writers;p=user.alice;t=...;e=...;k=0;s=...`.
//! The signature covers everything before the `;s=` field and is verified
//! with the signing key the public-key daemon replicated for `k`.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::BoxError;
use crate::pubkey::KeyProvider;

/// Validated role-token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleToken {
    /// Principal the token was issued to.
    pub principal: String,

    /// Domain the roles belong to.
    pub domain: String,

    /// Granted roles.
    pub roles: Vec<String>,

    /// Signing key ID.
    pub key_id: String,

    /// Issue time, seconds since the Unix epoch.
    pub time_stamp: i64,

    /// Expiry time, seconds since the Unix epoch.
    pub expiry_time: i64,
}

/// Parses and validates role tokens.
pub trait RoleTokenValidator: Send + Sync {
    /// Parse `token`, check expiry and verify its signature.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is malformed, expired, signed with
    /// an unknown key, or carries an invalid signature.
    fn parse_and_validate(&self, token: &str) -> Result<RoleToken, BoxError>;
}

/// Role-token validation failures.
#[derive(Debug, thiserror::Error)]
pub enum RoleTokenError {
    /// A required field is absent.
    #[error("role token missing field: {0}")]
    MissingField(&'static str),

    /// A numeric field failed to parse.
    #[error("role token invalid field: {0}")]
    InvalidField(&'static str),

    /// The token's expiry time has passed.
    #[error("role token expired")]
    Expired,

    /// No replicated signing key matches the token's key ID.
    #[error("unknown signing key: {0}")]
    UnknownSigningKey(String),

    /// The signature field is not valid base64.
    #[error("role token signature encoding invalid")]
    SignatureEncoding,

    /// The signature does not verify under the named key.
    #[error("role token signature mismatch: {0}")]
    SignatureMismatch(BoxError),
}

/// Validator backed by a [`KeyProvider`].
pub struct RoleTokenProcessor {
    keys: Arc<dyn KeyProvider>,
}

impl RoleTokenProcessor {
    /// Create a validator resolving signing keys through `keys`.
    #[must_use]
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    fn parse(token: &str) -> Result<RoleToken, RoleTokenError> {
        let mut domain = None;
        let mut roles = None;
        let mut principal = None;
        let mut key_id = None;
        let mut time_stamp = None;
        let mut expiry_time = None;

        for field in token.split(';') {
            let Some((name, value)) = field.split_once('=') else {
                continue;
            };
            match name {
                "d" => domain = Some(value),
                "r" => roles = Some(value),
                "p" => principal = Some(value),
                "k" => key_id = Some(value),
                "t" => {
                    time_stamp =
                        Some(value.parse().map_err(|_| RoleTokenError::InvalidField("t"))?);
                }
                "e" => {
                    expiry_time =
                        Some(value.parse().map_err(|_| RoleTokenError::InvalidField("e"))?);
                }
                _ => {}
            }
        }

        Ok(RoleToken {
            principal: principal
                .ok_or(RoleTokenError::MissingField("p"))?
                .to_string(),
            domain: domain.ok_or(RoleTokenError::MissingField("d"))?.to_string(),
            roles: roles
                .ok_or(RoleTokenError::MissingField("r"))?
                .split(',')
                .map(ToString::to_string)
                .collect(),
            key_id: key_id.ok_or(RoleTokenError::MissingField("k"))?.to_string(),
            time_stamp: time_stamp.ok_or(RoleTokenError::MissingField("t"))?,
            expiry_time: expiry_time.ok_or(RoleTokenError::MissingField("e"))?,
        })
    }
}

impl RoleTokenValidator for RoleTokenProcessor {
    fn parse_and_validate(&self, token: &str) -> Result<RoleToken, BoxError> {
        let parsed = Self::parse(token)?;

        if parsed.expiry_time <= chrono::Utc::now().timestamp() {
            return Err(RoleTokenError::Expired.into());
        }

        let signed_end = token.rfind(";s=").ok_or(RoleTokenError::MissingField("s"))?;
        let signature = STANDARD
            .decode(&token[signed_end + 3..])
            .map_err(|_| RoleTokenError::SignatureEncoding)?;

        let key = self
            .keys
            .get_key(&parsed.key_id)
            .ok_or_else(|| RoleTokenError::UnknownSigningKey(parsed.key_id.clone()))?;
        key.verify(token[..signed_end].as_bytes(), &signature)
            .map_err(RoleTokenError::SignatureMismatch)?;

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;
    use crate::pubkey::{Ed25519Verifier, SignatureVerifier};

    struct SingleKey(String, Arc<dyn SignatureVerifier>);

    impl KeyProvider for SingleKey {
        fn get_key(&self, key_id: &str) -> Option<Arc<dyn SignatureVerifier>> {
            (key_id == self.0).then(|| Arc::clone(&self.1))
        }
    }

    fn signed_token(signing: &SigningKey, expiry: i64) -> String {
        let unsigned = format!(
            "v=Z1;d=coretech;r=readers,writers;p=user.alice;t=1600000000;e={expiry};k=zts.0"
        );
        let signature = STANDARD.encode(signing.sign(unsigned.as_bytes()).to_bytes());
        format!("{unsigned};s={signature}")
    }

    fn processor(signing: &SigningKey) -> RoleTokenProcessor {
        RoleTokenProcessor::new(Arc::new(SingleKey(
            "zts.0".to_string(),
            Arc::new(Ed25519Verifier::new(signing.verifying_key())),
        )))
    }

    #[test]
    fn test_valid_token() {
        let signing = SigningKey::from_bytes(&[1u8; 32]);
        let expiry = chrono::Utc::now().timestamp() + 3600;

        let token = processor(&signing)
            .parse_and_validate(&signed_token(&signing, expiry))
            .unwrap();

        assert_eq!(token.principal, "user.alice");
        assert_eq!(token.domain, "coretech");
        assert_eq!(token.roles, ["readers", "writers"]);
        assert_eq!(token.time_stamp, 1_600_000_000);
        assert_eq!(token.expiry_time, expiry);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signing = SigningKey::from_bytes(&[1u8; 32]);
        let err = processor(&signing)
            .parse_and_validate(&signed_token(&signing, 1_600_000_001))
            .unwrap_err();

        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let signing = SigningKey::from_bytes(&[1u8; 32]);
        let expiry = chrono::Utc::now().timestamp() + 3600;
        let token = signed_token(&signing, expiry).replace("r=readers", "r=admins.");

        let err = processor(&signing).parse_and_validate(&token).unwrap_err();
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let signing = SigningKey::from_bytes(&[1u8; 32]);
        let other = SigningKey::from_bytes(&[2u8; 32]);
        let expiry = chrono::Utc::now().timestamp() + 3600;

        // Provider only knows the other key's ID.
        let p = RoleTokenProcessor::new(Arc::new(SingleKey(
            "zts.1".to_string(),
            Arc::new(Ed25519Verifier::new(other.verifying_key())),
        )));
        let err = p
            .parse_and_validate(&signed_token(&signing, expiry))
            .unwrap_err();

        assert_eq!(err.to_string(), "unknown signing key: zts.0");
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = RoleTokenProcessor::parse("v=Z1;r=readers;p=user.alice").unwrap_err();
        assert!(matches!(err, RoleTokenError::MissingField("d")));
    }
}
