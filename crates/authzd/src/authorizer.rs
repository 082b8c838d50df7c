//! Authorization engine, request dispatcher and lifecycle supervisor.
//!
//! The engine composes the replicated key/JWK/policy material with the
//! credential validators behind a decision cache: repeated calls with the
//! same credential and request context hit the cache and never touch the
//! validators or the policy store again until the entry expires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::access::{AccessTokenProcessor, AccessTokenValidator};
use crate::cache::PrincipalCache;
use crate::cert::{extract_domain_roles, PeerCertificate};
use crate::config::AuthorizerConfig;
use crate::daemon::RefreshOutcome;
use crate::errors::{BoxError, Error, Result};
use crate::jwk::{JwkDaemon, JwkProvider};
use crate::policy::{Assertion, PolicyDaemon};
use crate::principal::{
    principal_cache_footprint, AccessTokenPrincipal, Principal, TokenPrincipal,
};
use crate::pubkey::{KeyDaemon, KeyProvider};
use crate::request::AuthRequest;
use crate::role::{RoleTokenProcessor, RoleTokenValidator};

/// Delimiter joining the decision-key segments.
const CACHE_KEY_DELIMITER: char = ':';

/// Capacity of the supervised error stream. Refresh errors beyond this are
/// dropped until the caller drains.
const ERROR_CHANNEL_CAPACITY: usize = 200;

/// Token modality on the decision path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    RoleToken,
    AccessToken,
}

/// One enabled credential modality, in dispatcher order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Modality {
    RoleCert,
    AccessToken,
    RoleToken,
}

/// Maps an HTTP request onto the `(action, resource)` pair policy
/// assertions are written against.
pub trait Translator: Send + Sync {
    /// Translate `(action, resource, query)` within `domain`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; errors are surfaced to the caller as-is.
    fn translate(
        &self,
        domain: &str,
        action: &str,
        resource: &str,
        query: &str,
    ) -> std::result::Result<(String, String), BoxError>;
}

/// Builder for [`Authorizer`].
///
/// Collaborator daemons are injected; the role-token and access-token
/// validators default to the in-crate implementations wired to the
/// injected providers.
#[derive(Default)]
pub struct AuthorizerBuilder {
    config: AuthorizerConfig,
    pubkeyd: Option<Arc<dyn KeyDaemon>>,
    policyd: Option<Arc<dyn PolicyDaemon>>,
    jwkd: Option<Arc<dyn JwkDaemon>>,
    role_validator: Option<Arc<dyn RoleTokenValidator>>,
    access_validator: Option<Arc<dyn AccessTokenValidator>>,
    translator: Option<Arc<dyn Translator>>,
}

impl AuthorizerBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: AuthorizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject the public-key refresh daemon.
    #[must_use]
    pub fn pubkey_daemon(mut self, daemon: Arc<dyn KeyDaemon>) -> Self {
        self.pubkeyd = Some(daemon);
        self
    }

    /// Inject the policy refresh daemon.
    #[must_use]
    pub fn policy_daemon(mut self, daemon: Arc<dyn PolicyDaemon>) -> Self {
        self.policyd = Some(daemon);
        self
    }

    /// Inject the JWK refresh daemon.
    #[must_use]
    pub fn jwk_daemon(mut self, daemon: Arc<dyn JwkDaemon>) -> Self {
        self.jwkd = Some(daemon);
        self
    }

    /// Replace the default role-token validator.
    #[must_use]
    pub fn role_token_validator(mut self, validator: Arc<dyn RoleTokenValidator>) -> Self {
        self.role_validator = Some(validator);
        self
    }

    /// Replace the default access-token validator.
    #[must_use]
    pub fn access_token_validator(mut self, validator: Arc<dyn AccessTokenValidator>) -> Self {
        self.access_validator = Some(validator);
        self
    }

    /// Install a request-to-policy translator.
    #[must_use]
    pub fn translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Build the authorizer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an enabled component lacks its
    /// collaborator, and [`Error::NoAuthorizers`] when no credential
    /// modality is enabled.
    pub fn build(self) -> Result<Authorizer> {
        let config = self.config;

        if !config.disable_pubkeyd && self.pubkeyd.is_none() {
            return Err(Error::Config(
                "public-key daemon is required unless disabled".to_string(),
            ));
        }
        if !config.disable_policyd && self.policyd.is_none() {
            return Err(Error::Config(
                "policy daemon is required unless disabled".to_string(),
            ));
        }
        if !config.disable_jwkd && self.jwkd.is_none() {
            return Err(Error::Config(
                "jwk daemon is required unless disabled".to_string(),
            ));
        }

        let role_validator = match (&self.role_validator, config.enable_role_token) {
            (Some(v), _) => Some(Arc::clone(v)),
            (None, false) => None,
            (None, true) => {
                let daemon = self
                    .pubkeyd
                    .as_ref()
                    .filter(|_| !config.disable_pubkeyd)
                    .ok_or_else(|| {
                        Error::Config(
                            "role token modality requires the public-key daemon".to_string(),
                        )
                    })?;
                let keys: Arc<dyn KeyProvider> = daemon.clone();
                let validator: Arc<dyn RoleTokenValidator> =
                    Arc::new(RoleTokenProcessor::new(keys));
                Some(validator)
            }
        };

        let access_validator = match (&self.access_validator, config.access_token.enable) {
            (Some(v), _) => Some(Arc::clone(v)),
            (None, false) => None,
            (None, true) => {
                let daemon = self
                    .jwkd
                    .as_ref()
                    .filter(|_| !config.disable_jwkd)
                    .ok_or_else(|| {
                        Error::Config(
                            "access token modality requires the jwk daemon".to_string(),
                        )
                    })?;
                let jwks: Arc<dyn JwkProvider> = daemon.clone();
                let validator: Arc<dyn AccessTokenValidator> =
                    Arc::new(AccessTokenProcessor::new(jwks, &config.access_token));
                Some(validator)
            }
        };

        let mut authorizers = Vec::with_capacity(3);
        if config.enable_role_cert {
            info!("enabled role certificate authorizer");
            authorizers.push(Modality::RoleCert);
        }
        if config.access_token.enable {
            info!(
                verify_cert_thumbprint = config.access_token.verify_cert_thumbprint,
                verify_client_id = config.access_token.verify_client_id,
                "enabled access token authorizer"
            );
            authorizers.push(Modality::AccessToken);
        }
        if config.enable_role_token {
            info!("enabled role token authorizer");
            authorizers.push(Modality::RoleToken);
        }
        if authorizers.is_empty() {
            return Err(Error::NoAuthorizers);
        }

        let cache = Arc::new(PrincipalCache::new());
        let cache_memory_usage = Arc::new(AtomicI64::new(0));
        {
            let usage = Arc::clone(&cache_memory_usage);
            cache.set_expired_hook(Box::new(move |key, principal| {
                usage.fetch_sub(principal_cache_footprint(key, principal), Ordering::Relaxed);
            }));
        }

        Ok(Authorizer {
            config,
            pubkeyd: self.pubkeyd,
            policyd: self.policyd,
            jwkd: self.jwkd,
            role_validator,
            access_validator,
            translator: self.translator,
            cache,
            cache_memory_usage,
            authorizers,
        })
    }
}

/// The authorization engine.
///
/// Holds the verified replicas (through the injected daemons), the
/// credential validators and the decision cache, and exposes the
/// verify/authorize operations over the three credential modalities.
pub struct Authorizer {
    config: AuthorizerConfig,
    pubkeyd: Option<Arc<dyn KeyDaemon>>,
    policyd: Option<Arc<dyn PolicyDaemon>>,
    jwkd: Option<Arc<dyn JwkDaemon>>,
    role_validator: Option<Arc<dyn RoleTokenValidator>>,
    access_validator: Option<Arc<dyn AccessTokenValidator>>,
    translator: Option<Arc<dyn Translator>>,
    cache: Arc<PrincipalCache>,
    cache_memory_usage: Arc<AtomicI64>,
    authorizers: Vec<Modality>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("config", &self.config)
            .field("authorizers", &self.authorizers)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Start building an authorizer.
    #[must_use]
    pub fn builder() -> AuthorizerBuilder {
        AuthorizerBuilder::default()
    }

    fn policy_enabled(&self) -> bool {
        !self.config.disable_policyd
    }

    /// Warm up the replicas synchronously.
    ///
    /// Runs two concurrent groups: public keys then policies, and JWKs.
    /// The first failure cancels the sibling group and is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when `shutdown` is already cancelled,
    /// or the first collaborator failure otherwise.
    pub async fn init(&self, shutdown: &CancellationToken) -> Result<()> {
        if shutdown.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Policies are signed with the replicated public keys, so the
        // policy warm-up runs after the key warm-up within its group.
        let keys_then_policies = async {
            if shutdown.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !self.config.disable_pubkeyd {
                if let Some(daemon) = &self.pubkeyd {
                    daemon.update().await.map_err(Error::Update)?;
                }
            }
            if !self.config.disable_policyd {
                if let Some(daemon) = &self.policyd {
                    daemon.update().await.map_err(Error::Update)?;
                }
            }
            Ok(())
        };
        let jwks = async {
            if shutdown.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if !self.config.disable_jwkd {
                if let Some(daemon) = &self.jwkd {
                    daemon.update().await.map_err(Error::Update)?;
                }
            }
            Ok(())
        };

        tokio::try_join!(keys_then_policies, jwks)?;
        Ok(())
    }

    /// Supervise the background refresh loops and the cache sweeper.
    ///
    /// Refresh failures are reported on the returned stream, wrapped with
    /// an identifying prefix, and never terminate a loop. When `shutdown`
    /// is cancelled the sweeper stops, the cache is cleared,
    /// [`Error::Cancelled`] is written, and the stream closes.
    pub fn start(&self, shutdown: CancellationToken) -> mpsc::Receiver<Error> {
        let (tx, rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);

        let mut pubkey_rx = self
            .pubkeyd
            .as_ref()
            .filter(|_| !self.config.disable_pubkeyd)
            .map(|d| d.start(shutdown.child_token()));
        let mut policy_rx = self
            .policyd
            .as_ref()
            .filter(|_| !self.config.disable_policyd)
            .map(|d| d.start(shutdown.child_token()));
        let mut jwk_rx = self
            .jwkd
            .as_ref()
            .filter(|_| !self.config.disable_jwkd)
            .map(|d| d.start(shutdown.child_token()));

        let cache = Arc::clone(&self.cache);
        let sweep_period = (self.config.cache_ttl / 2).max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(sweep_period);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        cache.clear();
                        let _ = tx.try_send(Error::Cancelled);
                        return;
                    }
                    _ = sweep.tick() => cache.evict_expired(),
                    Some(outcome) = recv_refresh(&mut pubkey_rx) => {
                        if let Err(err) = outcome {
                            let _ = tx.try_send(Error::PubkeyRefresh(err));
                        }
                    }
                    Some(outcome) = recv_refresh(&mut policy_rx) => {
                        if let Err(err) = outcome {
                            let _ = tx.try_send(Error::PolicyRefresh(err));
                        }
                    }
                    Some(outcome) = recv_refresh(&mut jwk_rx) => {
                        if let Err(err) = outcome {
                            let _ = tx.try_send(Error::JwkRefresh(err));
                        }
                    }
                }
            }
        });

        rx
    }

    /// Verify the request's credentials against `(action, resource)`.
    ///
    /// OR-composition over the enabled modalities in fixed order; succeeds
    /// as soon as one modality accepts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] when every modality fails.
    pub async fn verify(&self, request: &AuthRequest, action: &str, resource: &str) -> Result<()> {
        self.authorize(request, action, resource).await.map(|_| ())
    }

    /// Authorize the request and return the winning principal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] when every modality fails;
    /// individual modality errors are not surfaced.
    pub async fn authorize(
        &self,
        request: &AuthRequest,
        action: &str,
        resource: &str,
    ) -> Result<Arc<Principal>> {
        for modality in &self.authorizers {
            let outcome = match modality {
                Modality::RoleCert => {
                    self.authorize_role_cert(&request.peer_certificates, action, resource)
                        .await
                }
                Modality::AccessToken => self.dispatch_access_token(request, action, resource).await,
                Modality::RoleToken => self.dispatch_role_token(request, action, resource).await,
            };
            if let Ok(principal) = outcome {
                return Ok(principal);
            }
        }

        Err(Error::InvalidCredentials)
    }

    async fn dispatch_access_token(
        &self,
        request: &AuthRequest,
        action: &str,
        resource: &str,
    ) -> Result<Arc<Principal>> {
        let token = request.bearer_token().ok_or(Error::InvalidCredentials)?;
        let cert = request.peer_certificates.first();
        self.authorize_token(Mode::AccessToken, token, action, resource, &request.query, cert)
            .await
    }

    async fn dispatch_role_token(
        &self,
        request: &AuthRequest,
        action: &str,
        resource: &str,
    ) -> Result<Arc<Principal>> {
        let token = request
            .header(&self.config.role_auth_header)
            .ok_or(Error::InvalidCredentials)?;
        self.authorize_token(Mode::RoleToken, token, action, resource, &request.query, None)
            .await
    }

    /// Verify a role token against `(action, resource)`.
    ///
    /// # Errors
    ///
    /// See [`authorize_role_token`](Self::authorize_role_token).
    pub async fn verify_role_token(&self, token: &str, action: &str, resource: &str) -> Result<()> {
        self.authorize_token(Mode::RoleToken, token, action, resource, "", None)
            .await
            .map(|_| ())
    }

    /// Authorize a role token and return the principal.
    ///
    /// # Errors
    ///
    /// Returns a wrapped validator error on a bad token, and a wrapped
    /// policy error when the token's roles are denied.
    pub async fn authorize_role_token(
        &self,
        token: &str,
        action: &str,
        resource: &str,
    ) -> Result<Arc<Principal>> {
        self.authorize_token(Mode::RoleToken, token, action, resource, "", None)
            .await
    }

    /// Verify an access token against `(action, resource)`, with an
    /// optional binding certificate.
    ///
    /// # Errors
    ///
    /// See [`authorize_access_token`](Self::authorize_access_token).
    pub async fn verify_access_token(
        &self,
        token: &str,
        action: &str,
        resource: &str,
        cert: Option<&PeerCertificate>,
    ) -> Result<()> {
        self.authorize_token(Mode::AccessToken, token, action, resource, "", cert)
            .await
            .map(|_| ())
    }

    /// Authorize an access token and return the principal.
    ///
    /// # Errors
    ///
    /// Returns a wrapped validator error on a bad token or failed mTLS
    /// binding, and a wrapped policy error when the token's roles are
    /// denied.
    pub async fn authorize_access_token(
        &self,
        token: &str,
        action: &str,
        resource: &str,
        cert: Option<&PeerCertificate>,
    ) -> Result<Arc<Principal>> {
        self.authorize_token(Mode::AccessToken, token, action, resource, "", cert)
            .await
    }

    /// Verify role certificates against `(action, resource)`.
    ///
    /// Role membership is extracted from the certificates' subject CNs and
    /// URI SANs; access is granted when any extracted domain passes policy
    /// evaluation. A no-op when policy evaluation is disabled.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRoleCertificate`] when no role identity could be
    /// extracted, or the last policy failure wrapped as
    /// [`Error::RoleCertificatesUnauthorized`].
    pub async fn verify_role_cert(
        &self,
        peer_certs: &[PeerCertificate],
        action: &str,
        resource: &str,
    ) -> Result<()> {
        if !self.policy_enabled() {
            return Ok(());
        }
        let Some(policyd) = &self.policyd else {
            return Ok(());
        };

        let domain_roles = extract_domain_roles(peer_certs, &self.config.role_cert_uri_prefix);
        if domain_roles.is_empty() {
            return Err(Error::InvalidRoleCertificate);
        }

        let mut last_err = None;
        for (domain, roles) in &domain_roles {
            match policyd.check_policy(domain, roles, action, resource).await {
                Ok(()) => return Ok(()),
                Err(err) => last_err = Some(err),
            }
        }

        match last_err {
            Some(err) => Err(Error::RoleCertificatesUnauthorized(err)),
            None => Err(Error::InvalidRoleCertificate),
        }
    }

    /// Authorize role certificates and return a principal.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotImplemented`]; the surface is declared
    /// for forward compatibility.
    pub async fn authorize_role_cert(
        &self,
        _peer_certs: &[PeerCertificate],
        _action: &str,
        _resource: &str,
    ) -> Result<Arc<Principal>> {
        Err(Error::NotImplemented)
    }

    /// Debug view of the replicated policy assertions per domain. Empty
    /// when policy evaluation is disabled.
    #[must_use]
    pub fn get_policy_cache(&self) -> HashMap<String, Vec<Assertion>> {
        if self.policy_enabled() {
            self.policyd
                .as_ref()
                .map(|d| d.policy_cache())
                .unwrap_or_default()
        } else {
            HashMap::new()
        }
    }

    /// Number of cached principals.
    #[must_use]
    pub fn get_principal_cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Memory usage of the principal cache: the container's structural
    /// estimate plus the accounted key/principal payload bytes.
    #[must_use]
    pub fn get_principal_cache_size(&self) -> i64 {
        self.cache.size() + self.cache_memory_usage.load(Ordering::Relaxed)
    }

    async fn authorize_token(
        &self,
        mode: Mode,
        token: &str,
        action: &str,
        resource: &str,
        query: &str,
        cert: Option<&PeerCertificate>,
    ) -> Result<Arc<Principal>> {
        let key = build_decision_key(
            self.policy_enabled(),
            self.translator.is_some(),
            token,
            action,
            resource,
            query,
            cert,
        )?;

        if let Some(cached) = self.cache.get(&key) {
            debug!(
                "use cached result. masked tok: {}, masked key: {}",
                mask_credential(token),
                mask_cache_key(&key, token)
            );
            if self.config.output_authorized_principal_log {
                info!(
                    "access authorized by cache, principal: {}, action: {}, resource: {}",
                    cached.name(),
                    action,
                    resource
                );
            }
            return Ok(cached);
        }

        let (domain, roles, mut principal) = match mode {
            Mode::RoleToken => {
                let validator = self.role_validator.as_ref().ok_or_else(|| {
                    Error::Config("role token modality is not enabled".to_string())
                })?;
                let rt = validator.parse_and_validate(token).map_err(|err| {
                    info!("error parse and validate role token, err: {err}");
                    Error::RoleTokenVerification(err)
                })?;
                let principal = Principal::RoleToken(TokenPrincipal {
                    name: rt.principal,
                    domain: rt.domain.clone(),
                    roles: rt.roles.clone(),
                    issue_time: rt.time_stamp,
                    expiry_time: rt.expiry_time,
                    authorized_roles: Vec::new(),
                });
                (rt.domain, rt.roles, principal)
            }
            Mode::AccessToken => {
                let validator = self.access_validator.as_ref().ok_or_else(|| {
                    Error::Config("access token modality is not enabled".to_string())
                })?;
                let at = validator.parse_and_validate(token, cert).map_err(|err| {
                    info!("error parse and validate access token, err: {err}");
                    Error::AccessTokenVerification(err)
                })?;
                let principal = Principal::AccessToken(AccessTokenPrincipal {
                    token: TokenPrincipal {
                        name: at.sub,
                        domain: at.aud.clone(),
                        roles: at.scope.clone(),
                        issue_time: at.iat,
                        expiry_time: at.exp,
                        authorized_roles: Vec::new(),
                    },
                    client_id: at.client_id,
                });
                (at.aud, at.scope, principal)
            }
        };

        let mut effective_action = action.to_string();
        let mut effective_resource = resource.to_string();

        if self.policy_enabled() {
            if let Some(translator) = &self.translator {
                let (act, res) = translator
                    .translate(&domain, &effective_action, &effective_resource, query)
                    .map_err(|err| {
                        info!(
                            "translator error, err: {err}, principal: {}, action: {effective_action}, resource: {effective_resource}",
                            principal.name()
                        );
                        Error::Translation(err)
                    })?;
                effective_action = act;
                effective_resource = res;
            }
            effective_resource = format!("{}{}", self.config.resource_prefix, effective_resource);

            let Some(policyd) = &self.policyd else {
                return Err(Error::Config("policy daemon is missing".to_string()));
            };
            let authorized_roles = policyd
                .check_policy_roles(&domain, &roles, &effective_action, &effective_resource)
                .await
                .map_err(|err| {
                    info!(
                        "check policy error, err: {err}, principal: {}, action: {effective_action}, resource: {effective_resource}",
                        principal.name()
                    );
                    Error::Unauthorized(err)
                })?;
            principal.set_authorized_roles(authorized_roles);
        }

        debug!(
            "set token result. masked tok: {}, masked key: {}, act: {effective_action}, res: {effective_resource}",
            mask_credential(token),
            mask_cache_key(&key, token)
        );

        let principal = Arc::new(principal);
        self.cache
            .set_with_expire(key.clone(), Arc::clone(&principal), self.config.cache_ttl);
        self.cache_memory_usage.fetch_add(
            principal_cache_footprint(&key, &principal),
            Ordering::Relaxed,
        );

        if self.config.output_authorized_principal_log {
            info!(
                "access authorized, principal: {}, action: {effective_action}, resource: {effective_resource}",
                principal.name()
            );
        }

        Ok(principal)
    }
}

async fn recv_refresh(
    rx: &mut Option<mpsc::Receiver<RefreshOutcome>>,
) -> Option<RefreshOutcome> {
    match rx {
        Some(channel) => {
            let outcome = channel.recv().await;
            if outcome.is_none() {
                // Closed channel: disable this branch instead of spinning.
                *rx = None;
            }
            outcome
        }
        None => std::future::pending().await,
    }
}

/// Build the cache key identifying a decision: credential, binding
/// certificate CNs, action/resource when policy evaluation is on, and the
/// query when a translator will see it.
fn build_decision_key(
    policy_enabled: bool,
    has_translator: bool,
    token: &str,
    action: &str,
    resource: &str,
    query: &str,
    cert: Option<&PeerCertificate>,
) -> Result<String> {
    let mut key = String::with_capacity(token.len() + action.len() + resource.len() + 4);
    key.push_str(token);

    if let Some(cert) = cert {
        key.push(CACHE_KEY_DELIMITER);
        key.push_str(&cert.issuer_common_name);
        key.push(CACHE_KEY_DELIMITER);
        key.push_str(&cert.subject_common_name);
    }

    if policy_enabled {
        if action.is_empty() || resource.is_empty() {
            return Err(Error::InvalidParameters);
        }
        key.push(CACHE_KEY_DELIMITER);
        key.push_str(action);
        key.push(CACHE_KEY_DELIMITER);
        key.push_str(resource);
        if !query.is_empty() && has_translator {
            key.push(CACHE_KEY_DELIMITER);
            key.push_str(query);
        }
    }

    Ok(key)
}

/// Mask a credential for logging: all but the first and last 4 characters
/// become `*`.
fn mask_credential(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
}

/// Mask the credential segment inside a cache key.
fn mask_cache_key(key: &str, token: &str) -> String {
    if token.is_empty() {
        return key.to_string();
    }
    key.replacen(token, &mask_credential(token), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding_cert() -> PeerCertificate {
        PeerCertificate {
            subject_common_name: "subject cn".to_string(),
            issuer_common_name: "issuer cn".to_string(),
            uri_sans: Vec::new(),
            not_before: 0,
            der: Vec::new(),
        }
    }

    #[test]
    fn test_decision_key_token_only() {
        let key = build_decision_key(false, false, "T", "", "", "", None).unwrap();
        assert_eq!(key, "T");
    }

    #[test]
    fn test_decision_key_with_policy() {
        let key = build_decision_key(true, false, "T", "a", "r", "", None).unwrap();
        assert_eq!(key, "T:a:r");
    }

    #[test]
    fn test_decision_key_with_binding_cert() {
        let cert = binding_cert();
        let key = build_decision_key(true, false, "T", "a", "r", "", Some(&cert)).unwrap();
        assert_eq!(key, "T:issuer cn:subject cn:a:r");
    }

    #[test]
    fn test_decision_key_query_needs_translator() {
        let with = build_decision_key(true, true, "T", "a", "r", "q=1", None).unwrap();
        let without = build_decision_key(true, false, "T", "a", "r", "q=1", None).unwrap();

        assert_eq!(with, "T:a:r:q=1");
        assert_eq!(without, "T:a:r");
    }

    #[test]
    fn test_decision_key_rejects_empty_action_or_resource() {
        assert!(matches!(
            build_decision_key(true, false, "T", "", "r", "", None),
            Err(Error::InvalidParameters)
        ));
        assert!(matches!(
            build_decision_key(true, false, "T", "a", "", "", None),
            Err(Error::InvalidParameters)
        ));
        // Policy disabled: empty pairs are fine.
        assert!(build_decision_key(false, false, "T", "", "", "", None).is_ok());
    }

    #[test]
    fn test_decision_key_is_deterministic() {
        let cert = binding_cert();
        let a = build_decision_key(true, true, "tok", "read", "res", "q", Some(&cert)).unwrap();
        let b = build_decision_key(true, true, "tok", "read", "res", "q", Some(&cert)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mask_credential() {
        assert_eq!(mask_credential(""), "");
        assert_eq!(mask_credential("short"), "*****");
        assert_eq!(mask_credential("exactly8"), "********");
        assert_eq!(mask_credential("abcdefghijkl"), "abcd****ijkl");
    }

    #[test]
    fn test_mask_cache_key_masks_credential_segment_only() {
        let masked = mask_cache_key("abcdefghijkl:a:r", "abcdefghijkl");
        assert_eq!(masked, "abcd****ijkl:a:r");
    }

    #[test]
    fn test_builder_requires_an_authorizer() {
        let config = AuthorizerConfig {
            disable_pubkeyd: true,
            disable_policyd: true,
            disable_jwkd: true,
            ..AuthorizerConfig::default()
        };
        let err = Authorizer::builder().config(config).build().unwrap_err();

        assert!(matches!(err, Error::NoAuthorizers));
        assert_eq!(err.to_string(), "error no authorizers");
    }

    #[test]
    fn test_builder_requires_daemons_unless_disabled() {
        let err = Authorizer::builder()
            .config(AuthorizerConfig::default())
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_modality_order_is_fixed() {
        let config = AuthorizerConfig {
            disable_pubkeyd: true,
            disable_policyd: true,
            disable_jwkd: true,
            enable_role_cert: true,
            enable_role_token: true,
            ..AuthorizerConfig::default()
        };
        // Role token needs a validator when pubkeyd is disabled.
        struct NoRoleTokens;
        impl RoleTokenValidator for NoRoleTokens {
            fn parse_and_validate(&self, _: &str) -> std::result::Result<crate::role::RoleToken, BoxError> {
                Err("no".into())
            }
        }

        let authorizer = Authorizer::builder()
            .config(config)
            .role_token_validator(Arc::new(NoRoleTokens))
            .build()
            .unwrap();

        assert_eq!(
            authorizer.authorizers,
            [Modality::RoleCert, Modality::RoleToken]
        );
    }
}
