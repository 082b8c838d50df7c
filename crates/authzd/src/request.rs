//! HTTP-like request surface for the dispatcher.
//!
//! Hosts embed the engine in their own handlers; this type carries the
//! three things the dispatcher inspects: headers, the raw query string,
//! and the mTLS peer certificates the host's TLS stack observed.

use http::header::AUTHORIZATION;
use http::HeaderMap;

use crate::cert::PeerCertificate;

/// Request view handed to [`verify`](crate::Authorizer::verify) and
/// [`authorize`](crate::Authorizer::authorize).
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Request headers.
    pub headers: HeaderMap,

    /// Raw query string, without the leading `?`.
    pub query: String,

    /// mTLS peer certificate chain, leaf first. Empty on plain TLS or
    /// cleartext connections.
    pub peer_certificates: Vec<PeerCertificate>,
}

impl AuthRequest {
    /// Create a request view.
    #[must_use]
    pub fn new(headers: HeaderMap, query: String, peer_certificates: Vec<PeerCertificate>) -> Self {
        Self {
            headers,
            query,
            peer_certificates,
        }
    }

    /// Bearer token from the `Authorization` header, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        scheme
            .eq_ignore_ascii_case("bearer")
            .then(|| token.trim_start())
    }

    /// Value of an arbitrary header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        let req = AuthRequest::new(headers, String::new(), Vec::new());

        assert_eq!(req.bearer_token(), Some("abc.def"));
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer tok"));
        let req = AuthRequest::new(headers, String::new(), Vec::new());

        assert_eq!(req.bearer_token(), Some("tok"));
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        let req = AuthRequest::new(headers, String::new(), Vec::new());

        assert_eq!(req.bearer_token(), None);
    }

    #[test]
    fn test_role_header_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("athenz-role-auth", HeaderValue::from_static("v=Z1;d=x"));
        let req = AuthRequest::new(headers, String::new(), Vec::new());

        assert_eq!(req.header("Athenz-Role-Auth"), Some("v=Z1;d=x"));
        assert_eq!(req.header("X-Missing"), None);
    }
}
