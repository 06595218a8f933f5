//! OAuth2 authorization-code subsystem.
//!
//! # Data Flow
//! ```text
//! POST /auth/login
//!     → ClientSettings (built per request from tenant + email domain)
//!     → flow::begin_login (CSRF state cookie + Provider::begin_login)
//!     → 303 to the provider's authorization endpoint
//!
//! /auth/callback/<provider>/<email domain>
//!     → flow::complete_callback (state cookie == state param)
//!     → Provider::complete_callback (code → token → profile)
//!     → raw profile string, stored verbatim as session user data
//! ```
//!
//! # Design Decisions
//! - Providers are trait objects looked up by identifier; adding one touches
//!   only this module and the registry
//! - Client credentials are never stored on the provider; each call receives
//!   an immutable `ClientSettings` for the current tenant
//! - Every protocol failure is terminal for the callback

pub mod flow;
pub mod google;
pub mod state;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::config::{DomainConfig, LoginEmailDomain, Secret};

pub use google::GoogleProvider;
pub use state::CsrfState;

/// Failures of the authorization-code flow.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("ERROR: OAuth callback: state bad")]
    StateMismatch,

    #[error("ERROR: OAuth callback: missing authorization code")]
    MissingCode,

    #[error("provider configuration invalid: {0}")]
    Configuration(String),

    #[error("ERROR: OAuth callback: code bad - code exchange wrong: {0}")]
    TokenExchange(String),

    #[error("failed getting user info: {0}")]
    Profile(String),

    #[error("unable to get user profile")]
    EmptyProfile,
}

/// Authorization, token and profile endpoints of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// OAuth client configuration for one tenant and email domain.
///
/// Constructed fresh for every request.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_secret: Secret,
    pub redirect_url: String,
}

impl ClientSettings {
    /// Settings for `login` under `tenant`, with the callback URL carrying
    /// the provider and email domain so the callback can re-resolve them.
    pub fn new(scheme: &str, tenant: &DomainConfig, login: &LoginEmailDomain) -> Self {
        let redirect_url = format!(
            "{}://{}/auth/callback/{}/{}",
            scheme,
            tenant.domain,
            login.provider.to_ascii_lowercase(),
            login.domain.to_ascii_lowercase()
        );

        Self {
            client_id: login.oauth_client_id.clone(),
            client_secret: login.oauth_client_secret.clone(),
            redirect_url,
        }
    }
}

/// An external identity provider.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Identifier used in configuration and callback paths (lowercase).
    fn id(&self) -> &str;

    /// Human-readable name for the login page.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Authorization endpoint URL carrying `state`.
    fn begin_login(&self, settings: &ClientSettings, state: &CsrfState) -> Result<Url, OAuthError>;

    /// Exchange `code` for a token and return the raw user profile.
    async fn complete_callback(
        &self,
        http: &reqwest::Client,
        settings: &ClientSettings,
        code: &str,
    ) -> Result<String, OAuthError>;
}

/// Registered providers keyed by lowercase identifier.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers at their public endpoints.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(GoogleProvider::new());
        registry
    }

    pub fn register(&mut self, provider: impl Provider + 'static) {
        let id = provider.id().to_ascii_lowercase();
        self.providers.insert(id, Arc::new(provider));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(&id.to_ascii_lowercase()).cloned()
    }

    /// Providers sorted by identifier.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        let mut all: Vec<_> = self.providers.values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_settings_redirect_url() {
        let tenant: DomainConfig = serde_yaml::from_str(
            "domain: example.com\nenabled: true\nsession_server_token: s\n",
        )
        .unwrap();
        let login = LoginEmailDomain {
            domain: "Known-Domain".into(),
            provider: "Google".into(),
            oauth_client_id: "client".into(),
            oauth_client_secret: Secret::new("shh"),
        };

        let settings = ClientSettings::new("https", &tenant, &login);
        assert_eq!(settings.redirect_url, "https://example.com/auth/callback/google/known-domain");
        assert_eq!(settings.client_id, "client");
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.get("GOOGLE").is_some());
        assert!(registry.get("github").is_none());
        assert_eq!(registry.providers().len(), 1);
    }
}
