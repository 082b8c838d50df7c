//! mTLS peer-certificate view.
//!
//! The library never terminates or parses TLS itself; the host hands over
//! the already-parsed fields of each peer certificate through
//! [`PeerCertificate`].

use std::collections::{HashMap, HashSet};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Subject CN marker separating a role domain from a role name.
const ROLE_IN_CN_DELIMITER: &str = ":role.";

/// Parsed view of one mTLS peer certificate, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    /// Subject common name.
    pub subject_common_name: String,

    /// Issuer common name.
    pub issuer_common_name: String,

    /// URI subject alternative names, in certificate order.
    pub uri_sans: Vec<String>,

    /// NotBefore, seconds since the Unix epoch.
    pub not_before: i64,

    /// Raw DER encoding of the certificate.
    pub der: Vec<u8>,
}

impl PeerCertificate {
    /// Base64url (unpadded) SHA-256 thumbprint of the DER encoding, the
    /// form carried in an access token's `cnf.x5t#S256` claim.
    #[must_use]
    pub fn thumbprint_sha256(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(&self.der))
    }
}

/// Extract `domain -> roles` from peer certificates.
///
/// Roles come from the subject CN when it contains `":role."` and from
/// every URI SAN starting with `uri_prefix` (trimmed, then split at the
/// first `/`). Duplicates across CN and SANs are dropped.
#[must_use]
pub(crate) fn extract_domain_roles(
    certs: &[PeerCertificate],
    uri_prefix: &str,
) -> HashMap<String, Vec<String>> {
    let mut seen = HashSet::new();
    let mut domain_roles: HashMap<String, Vec<String>> = HashMap::new();
    let mut add = |domain: &str, role: &str| {
        if seen.insert(format!("{domain}{role}")) {
            domain_roles
                .entry(domain.to_string())
                .or_default()
                .push(role.to_string());
        }
    };

    for cert in certs {
        if let Some((domain, role)) = cert.subject_common_name.split_once(ROLE_IN_CN_DELIMITER) {
            add(domain, role);
        }

        for uri in &cert.uri_sans {
            if let Some(rest) = uri.strip_prefix(uri_prefix) {
                if let Some((domain, role)) = rest.split_once('/') {
                    add(domain, role);
                }
            }
        }
    }

    domain_roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(cn: &str, sans: &[&str]) -> PeerCertificate {
        PeerCertificate {
            subject_common_name: cn.to_string(),
            issuer_common_name: "Athenz CA".to_string(),
            uri_sans: sans.iter().map(ToString::to_string).collect(),
            not_before: 0,
            der: vec![0x30, 0x82],
        }
    }

    #[test]
    fn test_roles_from_cn() {
        let certs = [cert("coretech:role.readers", &[])];
        let dr = extract_domain_roles(&certs, "athenz://role/");

        assert_eq!(dr["coretech"], ["readers"]);
    }

    #[test]
    fn test_roles_from_uri_sans() {
        let certs = [cert(
            "service.api",
            &["athenz://role/coretech/readers", "athenz://role/coretech/writers"],
        )];
        let dr = extract_domain_roles(&certs, "athenz://role/");

        assert_eq!(dr["coretech"], ["readers", "writers"]);
    }

    #[test]
    fn test_non_role_cn_and_foreign_uris_ignored() {
        let certs = [cert("service.api", &["spiffe://cluster/ns/default"])];
        let dr = extract_domain_roles(&certs, "athenz://role/");

        assert!(dr.is_empty());
    }

    #[test]
    fn test_duplicates_across_cn_and_sans_deduped() {
        let certs = [cert(
            "coretech:role.readers",
            &["athenz://role/coretech/readers", "athenz://role/coretech/writers"],
        )];
        let dr = extract_domain_roles(&certs, "athenz://role/");

        assert_eq!(dr["coretech"], ["readers", "writers"]);
    }

    #[test]
    fn test_san_without_role_separator_ignored() {
        let certs = [cert("service.api", &["athenz://role/coretech"])];
        let dr = extract_domain_roles(&certs, "athenz://role/");

        assert!(dr.is_empty());
    }

    #[test]
    fn test_thumbprint_is_base64url_sha256_of_der() {
        let c = cert("service.api", &[]);
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(&c.der));

        assert_eq!(c.thumbprint_sha256(), expected);
    }
}
