//! Authorized principal types.
//!
//! A [`Principal`] is the immutable result of a successful authorization.
//! The access-token variant carries the OAuth2 client ID on top of the
//! common token fields.

/// Common fields shared by all principal variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrincipal {
    /// Authenticated principal name.
    pub name: String,

    /// Policy domain the credential was issued for.
    pub domain: String,

    /// Roles asserted by the credential.
    pub roles: Vec<String>,

    /// Credential issue time, seconds since the Unix epoch.
    pub issue_time: i64,

    /// Credential expiry time, seconds since the Unix epoch.
    pub expiry_time: i64,

    /// Subset of `roles` that passed policy evaluation. Empty when policy
    /// evaluation is disabled.
    pub authorized_roles: Vec<String>,
}

/// Principal authenticated by an OAuth2 access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenPrincipal {
    /// Common token fields.
    pub token: TokenPrincipal,

    /// OAuth2 client ID from the token's `client_id` claim.
    pub client_id: String,
}

/// Result of a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Principal authenticated by a role token.
    RoleToken(TokenPrincipal),

    /// Principal authenticated by an access token.
    AccessToken(AccessTokenPrincipal),
}

impl Principal {
    fn token(&self) -> &TokenPrincipal {
        match self {
            Self::RoleToken(p) => p,
            Self::AccessToken(p) => &p.token,
        }
    }

    /// Authenticated principal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.token().name
    }

    /// Policy domain the credential was issued for.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.token().domain
    }

    /// Roles asserted by the credential.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.token().roles
    }

    /// Roles that passed policy evaluation.
    #[must_use]
    pub fn authorized_roles(&self) -> &[String] {
        &self.token().authorized_roles
    }

    /// Credential issue time, seconds since the Unix epoch.
    #[must_use]
    pub fn issue_time(&self) -> i64 {
        self.token().issue_time
    }

    /// Credential expiry time, seconds since the Unix epoch.
    #[must_use]
    pub fn expiry_time(&self) -> i64 {
        self.token().expiry_time
    }

    /// OAuth2 client ID, present on access-token principals only.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        match self {
            Self::RoleToken(_) => None,
            Self::AccessToken(p) => Some(&p.client_id),
        }
    }

    pub(crate) fn set_authorized_roles(&mut self, authorized_roles: Vec<String>) {
        match self {
            Self::RoleToken(p) => p.authorized_roles = authorized_roles,
            Self::AccessToken(p) => p.token.authorized_roles = authorized_roles,
        }
    }
}

/// Byte cost of a cached decision that the cache container itself cannot
/// see: the key and the principal's heap payloads, plus fixed overheads.
///
/// Per entry: the principal header, one string header plus payload length
/// for the key, name, domain and every role, and 16 bytes for the two
/// timestamps.
#[must_use]
pub fn principal_cache_footprint(key: &str, principal: &Principal) -> i64 {
    const STRING_HEADER: usize = std::mem::size_of::<String>();
    const VEC_HEADER: usize = std::mem::size_of::<Vec<String>>();
    const TIMESTAMPS: usize = 16;

    let mut bytes = std::mem::size_of::<Principal>() + TIMESTAMPS;
    bytes += key.len();
    bytes += principal.name().len() + STRING_HEADER;
    bytes += principal.domain().len() + STRING_HEADER;

    bytes += VEC_HEADER;
    for role in principal.roles() {
        bytes += role.len() + STRING_HEADER;
    }

    bytes += VEC_HEADER;
    for role in principal.authorized_roles() {
        bytes += role.len() + STRING_HEADER;
    }

    bytes as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_token_principal() -> Principal {
        Principal::RoleToken(TokenPrincipal {
            name: "user.alice".to_string(),
            domain: "coretech".to_string(),
            roles: vec!["readers".to_string(), "writers".to_string()],
            issue_time: 1_600_000_000,
            expiry_time: 1_600_003_600,
            authorized_roles: vec!["readers".to_string()],
        })
    }

    #[test]
    fn test_accessors() {
        let p = role_token_principal();

        assert_eq!(p.name(), "user.alice");
        assert_eq!(p.domain(), "coretech");
        assert_eq!(p.roles(), ["readers", "writers"]);
        assert_eq!(p.authorized_roles(), ["readers"]);
        assert_eq!(p.issue_time(), 1_600_000_000);
        assert_eq!(p.expiry_time(), 1_600_003_600);
        assert_eq!(p.client_id(), None);
    }

    #[test]
    fn test_access_token_client_id() {
        let p = Principal::AccessToken(AccessTokenPrincipal {
            token: TokenPrincipal {
                name: "svc.api".to_string(),
                domain: "coretech".to_string(),
                roles: vec!["readers".to_string()],
                issue_time: 0,
                expiry_time: 0,
                authorized_roles: Vec::new(),
            },
            client_id: "ui.client".to_string(),
        });

        assert_eq!(p.client_id(), Some("ui.client"));
    }

    #[test]
    fn test_authorized_roles_are_subset_of_roles() {
        let p = role_token_principal();
        for role in p.authorized_roles() {
            assert!(p.roles().contains(role));
        }
    }

    #[test]
    fn test_footprint_grows_with_payload() {
        let p = role_token_principal();

        let short = principal_cache_footprint("k", &p);
        let long = principal_cache_footprint("a-much-longer-cache-key", &p);

        assert!(short > 0);
        assert_eq!(long - short, "a-much-longer-cache-key".len() as i64 - 1);
    }
}
