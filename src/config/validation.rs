//! Tenant file validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - At most one enabled entry per hostname
//! - Enabled entries carry a session secret and cookie name
//! - Login email domain entries name both a domain and a provider
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TenantsFile → Result<(), Vec<ValidationError>>
//! - Any error rejects the whole file, so every tenant fails closed

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::TenantsFile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("domain entry {index} has an empty domain")]
    EmptyDomain { index: usize },

    #[error("domain {0} is enabled more than once")]
    DuplicateDomain(String),

    #[error("domain {0} has no session secret")]
    MissingSessionSecret(String),

    #[error("domain {0} has no session cookie name")]
    MissingCookieName(String),

    #[error("domain {domain} has a login email domain without a domain or provider")]
    IncompleteLoginDomain { domain: String },
}

/// Validate a parsed tenant file.
pub fn validate_tenants(tenants: &TenantsFile) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut enabled_hosts = HashSet::new();

    for (index, dc) in tenants.domains.iter().enumerate() {
        if dc.domain.trim().is_empty() {
            errors.push(ValidationError::EmptyDomain { index });
            continue;
        }

        if !dc.enabled {
            continue;
        }

        if !enabled_hosts.insert(dc.domain.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateDomain(dc.domain.clone()));
        }
        if dc.session_secret.is_empty() {
            errors.push(ValidationError::MissingSessionSecret(dc.domain.clone()));
        }
        if dc.session_cookie_name.trim().is_empty() {
            errors.push(ValidationError::MissingCookieName(dc.domain.clone()));
        }
        if dc
            .login_email_domains
            .iter()
            .any(|l| l.domain.trim().is_empty() || l.provider.trim().is_empty())
        {
            errors.push(ValidationError::IncompleteLoginDomain { domain: dc.domain.clone() });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> TenantsFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_duplicate_enabled_domains_rejected() {
        let tenants = parse(
            r#"
domains:
  - { domain: example.com, enabled: true, session_server_token: a }
  - { domain: EXAMPLE.com, enabled: true, session_server_token: b }
"#,
        );
        let errors = validate_tenants(&tenants).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateDomain("EXAMPLE.com".into())]);
    }

    #[test]
    fn test_disabled_duplicates_allowed() {
        let tenants = parse(
            r#"
domains:
  - { domain: example.com, enabled: true, session_server_token: a }
  - { domain: example.com, enabled: false }
"#,
        );
        assert!(validate_tenants(&tenants).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let tenants = parse(
            r#"
domains:
  - { domain: "", enabled: true }
  - domain: a.com
    enabled: true
    session_cookie_name: ""
    login_email_domains:
      - { domain: x.com, provider: "" }
"#,
        );
        let errors = validate_tenants(&tenants).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
