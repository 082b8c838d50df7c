//! Authorizer configuration.
//!
//! All tuning knobs recognised at construction time. The refresh-tuning
//! blocks (`pubkey`, `policy`, `jwk`) are carried for the daemon
//! implementations to read; the engine itself only consumes the cache TTL,
//! the modality switches, and the logging flag.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::access::AccessTokenParam;

/// Top-level authorizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizerConfig {
    /// Base URL of the authority service.
    #[serde(default)]
    pub athenz_url: String,

    /// Domains whose signed policies are replicated locally.
    #[serde(default)]
    pub athenz_domains: Vec<String>,

    /// TTL of entries in the principal (decision) cache.
    #[serde(default = "default_cache_ttl")]
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Disable the public-key refresh daemon.
    #[serde(default)]
    pub disable_pubkeyd: bool,

    /// Disable the policy refresh daemon. Also disables policy evaluation
    /// on the decision path.
    #[serde(default)]
    pub disable_policyd: bool,

    /// Disable the JWK refresh daemon.
    #[serde(default)]
    pub disable_jwkd: bool,

    /// Public-key daemon tuning, passed through to the daemon implementation.
    #[serde(default)]
    pub pubkey: PubkeyConfig,

    /// Policy daemon tuning, passed through to the daemon implementation.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// JWK daemon tuning, passed through to the daemon implementation.
    #[serde(default)]
    pub jwk: JwkConfig,

    /// Access-token modality parameters.
    #[serde(default)]
    pub access_token: AccessTokenParam,

    /// Enable the role-token modality.
    #[serde(default)]
    pub enable_role_token: bool,

    /// Header the role token is read from on dispatched requests.
    #[serde(default = "default_role_auth_header")]
    pub role_auth_header: String,

    /// Enable the role-certificate modality.
    #[serde(default)]
    pub enable_role_cert: bool,

    /// URI-SAN prefix recognised as a role URI on role certificates.
    #[serde(default = "default_role_cert_uri_prefix")]
    pub role_cert_uri_prefix: String,

    /// Fixed prefix prepended to the resource before policy evaluation.
    #[serde(default)]
    pub resource_prefix: String,

    /// Emit an INFO log line on every authorized decision.
    #[serde(default)]
    pub output_authorized_principal_log: bool,
}

/// Public-key daemon tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubkeyConfig {
    /// Interval between refresh attempts.
    #[serde(default = "default_pubkey_refresh_period")]
    #[serde(with = "humantime_serde")]
    pub refresh_period: Duration,

    /// Delay before retrying a failed refresh.
    #[serde(default = "default_retry_delay")]
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Lifetime of cached ETag responses.
    #[serde(default = "default_pubkey_etag_expiry")]
    #[serde(with = "humantime_serde")]
    pub etag_expiry: Duration,

    /// Interval between ETag cache purges.
    #[serde(default = "default_pubkey_etag_purge_period")]
    #[serde(with = "humantime_serde")]
    pub etag_purge_period: Duration,

    /// System authority domain the signing keys are published under.
    #[serde(default = "default_pubkey_sys_auth_domain")]
    pub sys_auth_domain: String,
}

/// Policy daemon tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Interval between refresh attempts.
    #[serde(default = "default_policy_refresh_period")]
    #[serde(with = "humantime_serde")]
    pub refresh_period: Duration,

    /// Interval between purges of expired policy material.
    #[serde(default = "default_policy_purge_period")]
    #[serde(with = "humantime_serde")]
    pub purge_period: Duration,

    /// Margin subtracted from policy expiry when judging staleness.
    #[serde(default = "default_policy_expiry_margin")]
    #[serde(with = "humantime_serde")]
    pub expiry_margin: Duration,

    /// Delay before retrying a failed refresh.
    #[serde(default = "default_retry_delay")]
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Number of refresh retries before the attempt is reported as failed.
    #[serde(default = "default_policy_retry_attempts")]
    pub retry_attempts: u32,
}

/// JWK daemon tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkConfig {
    /// Interval between refresh attempts.
    #[serde(default = "default_jwk_refresh_period")]
    #[serde(with = "humantime_serde")]
    pub refresh_period: Duration,

    /// Delay before retrying a failed refresh.
    #[serde(default = "default_retry_delay")]
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Additional JWK set URLs beyond the authority service's default.
    #[serde(default)]
    pub urls: Vec<String>,
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_role_auth_header() -> String {
    "Athenz-Role-Auth".to_string()
}

fn default_role_cert_uri_prefix() -> String {
    "athenz://role/".to_string()
}

const fn default_retry_delay() -> Duration {
    Duration::from_secs(60)
}

const fn default_pubkey_refresh_period() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

const fn default_pubkey_etag_expiry() -> Duration {
    Duration::from_secs(168 * 60 * 60)
}

const fn default_pubkey_etag_purge_period() -> Duration {
    Duration::from_secs(84 * 60 * 60)
}

fn default_pubkey_sys_auth_domain() -> String {
    "sys.auth".to_string()
}

const fn default_policy_refresh_period() -> Duration {
    Duration::from_secs(30 * 60)
}

const fn default_policy_purge_period() -> Duration {
    Duration::from_secs(60 * 60)
}

const fn default_policy_expiry_margin() -> Duration {
    Duration::from_secs(3 * 60 * 60)
}

const fn default_policy_retry_attempts() -> u32 {
    2
}

const fn default_jwk_refresh_period() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            athenz_url: String::new(),
            athenz_domains: Vec::new(),
            cache_ttl: default_cache_ttl(),
            disable_pubkeyd: false,
            disable_policyd: false,
            disable_jwkd: false,
            pubkey: PubkeyConfig::default(),
            policy: PolicyConfig::default(),
            jwk: JwkConfig::default(),
            access_token: AccessTokenParam::default(),
            enable_role_token: false,
            role_auth_header: default_role_auth_header(),
            enable_role_cert: false,
            role_cert_uri_prefix: default_role_cert_uri_prefix(),
            resource_prefix: String::new(),
            output_authorized_principal_log: false,
        }
    }
}

impl Default for PubkeyConfig {
    fn default() -> Self {
        Self {
            refresh_period: default_pubkey_refresh_period(),
            retry_delay: default_retry_delay(),
            etag_expiry: default_pubkey_etag_expiry(),
            etag_purge_period: default_pubkey_etag_purge_period(),
            sys_auth_domain: default_pubkey_sys_auth_domain(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            refresh_period: default_policy_refresh_period(),
            purge_period: default_policy_purge_period(),
            expiry_margin: default_policy_expiry_margin(),
            retry_delay: default_retry_delay(),
            retry_attempts: default_policy_retry_attempts(),
        }
    }
}

impl Default for JwkConfig {
    fn default() -> Self {
        Self {
            refresh_period: default_jwk_refresh_period(),
            retry_delay: default_retry_delay(),
            urls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthorizerConfig::default();

        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.role_auth_header, "Athenz-Role-Auth");
        assert_eq!(config.role_cert_uri_prefix, "athenz://role/");
        assert!(!config.enable_role_token);
        assert!(!config.enable_role_cert);
        assert!(!config.access_token.enable);
        assert_eq!(config.policy.retry_attempts, 2);
        assert_eq!(config.pubkey.sys_auth_domain, "sys.auth");
    }

    #[test]
    fn test_deserialize_humantime_durations() {
        let config: AuthorizerConfig = serde_json::from_str(
            r#"{
                "athenz_url": "https://athenz.example.com/zts/v1",
                "athenz_domains": ["coretech"],
                "cache_ttl": "30s",
                "policy": { "refresh_period": "5m" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.policy.refresh_period, Duration::from_secs(300));
        assert_eq!(config.policy.purge_period, Duration::from_secs(3600));
    }
}
