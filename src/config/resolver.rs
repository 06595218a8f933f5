//! Per-request tenant resolution.
//!
//! # Responsibilities
//! - Re-read the tenant file on every call (no cross-request cache)
//! - Return the enabled entry for a hostname, or a typed failure
//! - Decide whether a path bypasses authentication, failing closed
//!
//! # Design Decisions
//! - The resolver owns only the file path; it holds no mutable state and is
//!   safe to call from any number of concurrent tasks
//! - Every derived value (secrets, OAuth credentials) comes from the returned
//!   `DomainConfig`, which is owned by the calling request
//! - Unknown and disabled hostnames produce the same error

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::loader::{load_tenants, ConfigError};
use crate::config::schema::DomainConfig;

/// Why a hostname could not be resolved to a tenant.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The tenant file could not be read, parsed or validated.
    #[error("tenant configuration unavailable: {0}")]
    Source(#[from] ConfigError),

    /// No enabled entry exists for the hostname.
    #[error("Domain not found in config file: {0}")]
    UnknownDomain(String),
}

/// Resolves tenant configuration from the tenant file.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    path: Option<PathBuf>,
}

impl DomainResolver {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Load the tenant file and return the enabled entry for `host`.
    pub fn resolve(&self, host: &str) -> Result<DomainConfig, ResolveError> {
        let path = self.path.as_deref().ok_or(ConfigError::NotConfigured)?;
        let tenants = load_tenants(path)?;

        tenants
            .get(host)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownDomain(host.to_string()))
    }

    /// Whether `decoded_path` on `host` bypasses authentication.
    ///
    /// Any resolution failure means the path requires authentication.
    pub fn is_unauthenticated_path(&self, host: &str, decoded_path: &str) -> bool {
        match self.resolve(host) {
            Ok(dc) => dc.allows_unauthenticated(decoded_path),
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "Tenant unresolved, path requires authentication");
                false
            }
        }
    }
}

/// A path matcher from a tenant's unauthenticated allowlist.
///
/// `/public/*` and `/public/` match by prefix, anything else matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        if let Some(prefix) = raw.strip_suffix('*') {
            PathPattern::Prefix(prefix.to_string())
        } else if raw.ends_with('/') {
            PathPattern::Prefix(raw.to_string())
        } else {
            PathPattern::Exact(raw.to_string())
        }
    }

    /// Match against an already percent-decoded path.
    pub fn matches(&self, decoded_path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => decoded_path == p,
            PathPattern::Prefix(p) => decoded_path.starts_with(p.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|raw| PathPattern::parse(&raw))
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathPattern::Exact(p) => serializer.serialize_str(p),
            PathPattern::Prefix(p) if p.ends_with('/') => serializer.serialize_str(p),
            PathPattern::Prefix(p) => serializer.serialize_str(&format!("{}*", p)),
        }
    }
}

/// Percent-decode a request path for allowlist matching.
///
/// Paths that do not decode to UTF-8 are returned as-is, which can only
/// make an allowlist match less likely.
pub fn decode_path(escaped: &str) -> String {
    urlencoding::decode(escaped)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| escaped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
domains:
  - domain: example.com
    enabled: true
    session_server_token: secret
    unauthenticated_paths: ["/public/*", "/healthz", "/docs/"]
  - domain: testing.uk
    session_server_token: secret
"#;

    fn resolver_with(content: &str) -> (tempfile::NamedTempFile, DomainResolver) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let resolver = DomainResolver::new(Some(file.path().to_path_buf()));
        (file, resolver)
    }

    #[test]
    fn test_resolve_enabled_domain() {
        let (_f, resolver) = resolver_with(YAML);
        let dc = resolver.resolve("example.com").unwrap();
        assert_eq!(dc.domain, "example.com");
    }

    #[test]
    fn test_disabled_and_missing_are_unknown() {
        let (_f, resolver) = resolver_with(YAML);
        assert!(matches!(resolver.resolve("testing.uk"), Err(ResolveError::UnknownDomain(_))));
        assert!(matches!(resolver.resolve("not-valid.local"), Err(ResolveError::UnknownDomain(_))));
    }

    #[test]
    fn test_source_errors_are_distinct() {
        let resolver = DomainResolver::new(None);
        assert!(matches!(
            resolver.resolve("example.com"),
            Err(ResolveError::Source(ConfigError::NotConfigured))
        ));

        let (_f, resolver) = resolver_with("domains: [ broken");
        assert!(matches!(resolver.resolve("example.com"), Err(ResolveError::Source(_))));
    }

    #[test]
    fn test_unauthenticated_paths() {
        let (_f, resolver) = resolver_with(YAML);
        assert!(resolver.is_unauthenticated_path("example.com", "/public/a.css"));
        assert!(resolver.is_unauthenticated_path("example.com", "/healthz"));
        assert!(resolver.is_unauthenticated_path("example.com", "/docs/intro"));
        assert!(!resolver.is_unauthenticated_path("example.com", "/healthz/deep"));
        assert!(!resolver.is_unauthenticated_path("example.com", "/private"));
    }

    #[test]
    fn test_unauthenticated_paths_fail_closed() {
        let (_f, resolver) = resolver_with(YAML);
        assert!(!resolver.is_unauthenticated_path("testing.uk", "/public/a.css"));
        assert!(!DomainResolver::new(None).is_unauthenticated_path("example.com", "/healthz"));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/public/my%20file.txt"), "/public/my file.txt");
        assert_eq!(decode_path("/plain"), "/plain");
    }
}
