//! # authzd
//!
//! Embeddable authorization engine for an Athenz-style RBAC control
//! plane.
//!
//! Hosts embed this crate in their request handlers to decide whether an
//! incoming request, bearing one or more credentials, may perform an
//! `(action, resource)` pair against a named policy domain, without
//! consulting the authority service on the request path. Verified
//! replicas of public keys, JWK sets and signed domain policies are kept
//! current by background refresh daemons; credentials are validated and
//! policy evaluated entirely locally, fronted by a TTL'd decision cache.
//!
//! ## Credential modalities
//!
//! - **Role token**: an opaque signed token asserting role membership.
//! - **Access token**: a JWT with optional mTLS proof-of-possession
//!   binding.
//! - **Role certificate**: an X.509 certificate whose CN or URI SANs
//!   encode role membership.
//!
//! Dispatched requests are evaluated with OR semantics over the enabled
//! modalities in fixed order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use authzd::{Authorizer, AuthorizerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(
//! #     pubkeyd: Arc<dyn authzd::KeyDaemon>,
//! #     policyd: Arc<dyn authzd::PolicyDaemon>,
//! # ) -> Result<(), authzd::Error> {
//! let config = AuthorizerConfig {
//!     athenz_url: "https://athenz.example.com/zts/v1".to_string(),
//!     athenz_domains: vec!["coretech".to_string()],
//!     enable_role_token: true,
//!     disable_jwkd: true,
//!     ..AuthorizerConfig::default()
//! };
//!
//! let authorizer = Authorizer::builder()
//!     .config(config)
//!     .pubkey_daemon(pubkeyd)
//!     .policy_daemon(policyd)
//!     .build()?;
//!
//! let shutdown = CancellationToken::new();
//! authorizer.init(&shutdown).await?;
//! let mut errors = authorizer.start(shutdown.clone());
//! tokio::spawn(async move {
//!     while let Some(err) = errors.recv().await {
//!         tracing::warn!("background refresh: {err}");
//!     }
//! });
//!
//! let principal = authorizer
//!     .authorize_role_token("v=Z1;d=coretech;...", "read", "coretech:resource")
//!     .await?;
//! assert_eq!(principal.domain(), "coretech");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod authorizer;
pub mod cache;
pub mod cert;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod jwk;
pub mod policy;
pub mod principal;
pub mod pubkey;
pub mod request;
pub mod role;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::authorizer::{Authorizer, AuthorizerBuilder, Translator};
    pub use crate::cert::PeerCertificate;
    pub use crate::config::AuthorizerConfig;
    pub use crate::errors::{BoxError, Error};
    pub use crate::principal::Principal;
    pub use crate::request::AuthRequest;
}

/// Re-export commonly used types at the crate root.
pub use access::{AccessTokenParam, AccessTokenValidator};
pub use authorizer::{Authorizer, AuthorizerBuilder, Translator};
pub use cert::PeerCertificate;
pub use config::AuthorizerConfig;
pub use daemon::Daemon;
pub use errors::{BoxError, Error};
pub use jwk::{JwkDaemon, JwkProvider};
pub use policy::{Assertion, Effect, PolicyDaemon};
pub use principal::Principal;
pub use pubkey::{KeyDaemon, KeyProvider};
pub use request::AuthRequest;
pub use role::RoleTokenValidator;
