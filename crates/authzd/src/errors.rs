//! Crate-level error type.
//!
//! Collaborator traits (key daemons, policy store, validators, translator)
//! report failures as boxed errors; the engine wraps them into the variants
//! below so that callers observe stable, matchable error kinds with stable
//! messages.

/// Boxed error used at the collaborator seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the authorization engine and its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty action or resource while policy evaluation is enabled.
    #[error("empty action / resource: Access denied due to invalid/empty action/resource values")]
    InvalidParameters,

    /// No enabled authorizer accepted the request's credentials.
    #[error("Access denied due to invalid credentials")]
    InvalidCredentials,

    /// Construction finished with an empty set of enabled modalities.
    #[error("error no authorizers")]
    NoAuthorizers,

    /// Invalid builder input or a missing collaborator for an enabled modality.
    #[error("error creating authorizer: {0}")]
    Config(String),

    /// Role token failed to parse or validate.
    #[error("error authorize role token: {0}")]
    RoleTokenVerification(BoxError),

    /// Access token failed to parse or validate.
    #[error("error authorize access token: {0}")]
    AccessTokenVerification(BoxError),

    /// Policy evaluation denied the credential's roles.
    #[error("token unauthorized: {0}")]
    Unauthorized(BoxError),

    /// No role-cert domain passed policy evaluation.
    #[error("role certificates unauthorized: {0}")]
    RoleCertificatesUnauthorized(BoxError),

    /// Peer certificates carried no recognizable role identity.
    #[error("invalid role certificate")]
    InvalidRoleCertificate,

    /// Request-to-policy translation failed; the translator's error is
    /// surfaced as-is.
    #[error("{0}")]
    Translation(BoxError),

    /// Warm-up of a collaborator daemon failed during `init`.
    #[error("{0}")]
    Update(BoxError),

    /// Background public-key refresh attempt failed.
    #[error("update pubkey error: {0}")]
    PubkeyRefresh(BoxError),

    /// Background policy refresh attempt failed.
    #[error("update policy error: {0}")]
    PolicyRefresh(BoxError),

    /// Background JWK refresh attempt failed.
    #[error("update jwk error: {0}")]
    JwkRefresh(BoxError),

    /// The supplied cancellation token was already, or became, cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// Declared surface that is not implemented yet.
    #[error("AuthorizeRoleCert has not yet been implemented")]
    NotImplemented,
}
