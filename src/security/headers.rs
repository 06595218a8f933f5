//! Security response headers.
//!
//! # Responsibilities
//! - Default values for a fixed set of owned headers
//! - Per-tenant overrides (case-insensitive header names)
//! - Suppression via the `NO-SET` sentinel
//!
//! Headers outside the owned set are never touched.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::DomainConfig;

/// Override value that removes a header entirely.
pub const SUPPRESS_SENTINEL: &str = "NO-SET";

/// Owned headers and their defaults, in application order.
pub const DEFAULT_SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("content-security-policy", "default-src 'self'"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "feature-policy",
        "vibrate 'none'; geolocation 'none'; microphone 'none'; camera 'none'; payment 'none'; notifications 'none';",
    ),
];

/// The value `header` should carry for `tenant`, or `None` when suppressed.
///
/// Without a tenant the default applies. Headers outside the owned set
/// have no effective value.
pub fn effective_value(tenant: Option<&DomainConfig>, header: &str) -> Option<HeaderValue> {
    let default = DEFAULT_SECURITY_HEADERS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(header))
        .map(|(_, value)| *value)?;

    match tenant.and_then(|t| t.security_header_override(header)) {
        Some(SUPPRESS_SENTINEL) => None,
        Some(custom) => match HeaderValue::from_str(custom) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(header = %header, "Invalid security header override, using default");
                Some(HeaderValue::from_static(default))
            }
        },
        None => Some(HeaderValue::from_static(default)),
    }
}

/// Set every owned header on `headers`.
///
/// Effective values replace any same-named value already present.
/// Suppressed headers are left as they are.
pub fn apply_security_headers(tenant: Option<&DomainConfig>, headers: &mut HeaderMap) {
    for &(name, _) in DEFAULT_SECURITY_HEADERS {
        if let Some(value) = effective_value(tenant, name) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}
