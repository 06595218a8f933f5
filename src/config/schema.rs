//! Configuration schema definitions.
//!
//! Two documents configure the gateway:
//! - [`GatewayConfig`]: process bootstrap (listen address, tenant file path, TLS toggle).
//! - [`TenantsFile`]: the multi-tenant YAML file, re-read on every resolution.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::resolver::PathPattern;

/// Default name of the tenant session cookie.
pub const DEFAULT_SESSION_COOKIE_NAME: &str = "_session";

/// Root bootstrap configuration for the gateway process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path to the tenant YAML file.
    pub domain_config_path: Option<PathBuf>,

    /// Skip TLS certificate verification when forwarding to the backend.
    pub skip_tls_validation: bool,

    /// Directory served under `/auth/assets/`.
    pub asset_path: PathBuf,

    /// Scheme used when building OAuth callback URLs.
    pub callback_scheme: String,

    /// Mark gateway cookies `Secure`.
    pub secure_cookies: bool,

    /// Maximum `/auth` form body in bytes. Forwarded bodies are streamed uncapped.
    pub max_body_size: usize,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            domain_config_path: None,
            skip_tls_validation: false,
            asset_path: PathBuf::from("web/static"),
            callback_scheme: "https".to_string(),
            secure_cookies: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Deadline for the gateway round trip up to response headers, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// A secret string that never appears in logs or `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[redacted]")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(|v| Secret(v.unwrap_or_default()))
    }
}

/// The tenant file: an ordered list of domain entries.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TenantsFile {
    pub domains: Vec<DomainConfig>,
}

impl TenantsFile {
    /// Find the enabled entry for a hostname (case-insensitive).
    pub fn get(&self, host: &str) -> Option<&DomainConfig> {
        self.domains
            .iter()
            .find(|d| d.enabled && d.domain.eq_ignore_ascii_case(host))
    }
}

/// Configuration for one tenant hostname.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainConfig {
    /// Hostname this entry applies to.
    pub domain: String,

    /// Disabled entries are invisible to resolution.
    #[serde(default)]
    pub enabled: bool,

    /// Title shown on the login and error pages.
    #[serde(default, rename = "auth_pages_title")]
    pub auth_page_title: String,

    #[serde(default = "default_cookie_name")]
    pub session_cookie_name: String,

    /// Secret the session encryption key is derived from.
    #[serde(default, rename = "session_server_token", alias = "session_signing_secret")]
    pub session_secret: Secret,

    /// Header name to value. `NO-SET` suppresses the header.
    #[serde(default)]
    pub security_headers: BTreeMap<String, String>,

    /// Paths that bypass authentication, checked in order.
    #[serde(default)]
    pub unauthenticated_paths: Vec<PathPattern>,

    #[serde(default)]
    pub login_email_domains: Vec<LoginEmailDomain>,
}

fn default_cookie_name() -> String {
    DEFAULT_SESSION_COOKIE_NAME.to_string()
}

impl DomainConfig {
    /// Find the login entry for an email domain suffix and provider.
    ///
    /// Both comparisons are case-insensitive.
    pub fn login_email_domain(&self, email_domain: &str, provider: &str) -> Option<&LoginEmailDomain> {
        self.login_email_domains.iter().find(|l| {
            l.domain.eq_ignore_ascii_case(email_domain) && l.provider.eq_ignore_ascii_case(provider)
        })
    }

    /// The tenant's override for a security header, matched case-insensitively.
    pub fn security_header_override(&self, header: &str) -> Option<&str> {
        self.security_headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(header))
            .map(|(_, value)| value.as_str())
    }

    /// Whether a decoded request path bypasses authentication.
    pub fn allows_unauthenticated(&self, decoded_path: &str) -> bool {
        self.unauthenticated_paths
            .iter()
            .any(|pattern| pattern.matches(decoded_path))
    }
}

/// Maps an email domain suffix to an OAuth provider and its per-tenant credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginEmailDomain {
    /// Email domain suffix, e.g. `example.com` for `someone@example.com`.
    pub domain: String,

    /// Provider identifier, e.g. `google`.
    pub provider: String,

    #[serde(default, alias = "client_id", alias = "google_oauth_client_id")]
    pub oauth_client_id: String,

    #[serde(default, alias = "client_secret", alias = "google_oauth_client_secret")]
    pub oauth_client_secret: Secret,
}
