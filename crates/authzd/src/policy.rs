//! Signed-policy store contract.
//!
//! The policy daemon replicates signed policy bundles per domain and
//! answers queries over an atomically swappable in-memory snapshot, so
//! foreground reads never block a refresh.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::daemon::Daemon;
use crate::errors::BoxError;

/// Assertion effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effect {
    /// Grants the action on the resource.
    Allow,
    /// Denies the action on the resource, overriding any allow.
    Deny,
}

/// One policy assertion, grouped by domain in the replicated bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// Fully qualified role the assertion applies to.
    pub role: String,

    /// Action glob.
    pub action: String,

    /// Resource glob.
    pub resource: String,

    /// Allow or deny.
    pub effect: Effect,
}

/// Policy refresh daemon: lifecycle plus policy queries.
#[async_trait]
pub trait PolicyDaemon: Daemon {
    /// Return the subset of `roles` granted `action` on `resource` in
    /// `domain` by some ALLOW assertion and not overridden by a DENY.
    ///
    /// # Errors
    ///
    /// Returns an error when no role matches or any DENY matches.
    async fn check_policy_roles(
        &self,
        domain: &str,
        roles: &[String],
        action: &str,
        resource: &str,
    ) -> Result<Vec<String>, BoxError>;

    /// Boolean form of [`check_policy_roles`](Self::check_policy_roles).
    ///
    /// # Errors
    ///
    /// Returns an error when access is not granted.
    async fn check_policy(
        &self,
        domain: &str,
        roles: &[String],
        action: &str,
        resource: &str,
    ) -> Result<(), BoxError>;

    /// Debug view of the replicated assertions, keyed by domain.
    fn policy_cache(&self) -> HashMap<String, Vec<Assertion>>;
}
