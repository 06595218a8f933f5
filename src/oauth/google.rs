//! Google identity provider.

use async_trait::async_trait;
use oauth2::{
    basic::{BasicClient, BasicTokenType},
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EmptyExtraTokenFields,
    RedirectUrl, Scope, StandardTokenResponse, TokenResponse, TokenUrl,
};
use url::Url;

use crate::oauth::{ClientSettings, CsrfState, OAuthEndpoints, OAuthError, Provider};

/// Identifier used in configuration and callback paths.
pub const GOOGLE_PROVIDER_ID: &str = "google";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const GOOGLE_SCOPES: &[&str] = &[
    "profile",
    "email",
    "https://www.googleapis.com/auth/userinfo.email",
];

type GoogleTokenResponse = StandardTokenResponse<EmptyExtraTokenFields, BasicTokenType>;

/// Google OAuth2 with the userinfo endpoint as the profile source.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    endpoints: OAuthEndpoints,
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self::with_endpoints(OAuthEndpoints {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }

    /// Same protocol against different endpoints.
    pub fn with_endpoints(endpoints: OAuthEndpoints) -> Self {
        Self { endpoints }
    }

    fn redirect_url(settings: &ClientSettings) -> Result<RedirectUrl, OAuthError> {
        RedirectUrl::new(settings.redirect_url.clone())
            .map_err(|e| OAuthError::Configuration(format!("invalid redirect URL: {}", e)))
    }
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn id(&self) -> &str {
        GOOGLE_PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Google"
    }

    fn begin_login(&self, settings: &ClientSettings, state: &CsrfState) -> Result<Url, OAuthError> {
        let auth_url = AuthUrl::new(self.endpoints.auth_url.clone())
            .map_err(|e| OAuthError::Configuration(format!("invalid auth URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(settings.client_secret.expose().to_string()))
            .set_auth_uri(auth_url)
            .set_redirect_uri(Self::redirect_url(settings)?);

        let token = state.secret().to_string();
        let mut request = client.authorize_url(move || CsrfToken::new(token));
        for scope in GOOGLE_SCOPES {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }

        let (url, _) = request.url();
        Ok(url)
    }

    async fn complete_callback(
        &self,
        http: &reqwest::Client,
        settings: &ClientSettings,
        code: &str,
    ) -> Result<String, OAuthError> {
        let token_url = TokenUrl::new(self.endpoints.token_url.clone())
            .map_err(|e| OAuthError::Configuration(format!("invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(settings.client_secret.expose().to_string()))
            .set_token_uri(token_url)
            .set_redirect_uri(Self::redirect_url(settings)?);

        let token: GoogleTokenResponse = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(http)
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        let profile = http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| OAuthError::Profile(e.to_string()))?
            .text()
            .await
            .map_err(|e| OAuthError::Profile(format!("failed reading response body: {}", e)))?;

        tracing::debug!(provider = GOOGLE_PROVIDER_ID, bytes = profile.len(), "Fetched user profile");
        Ok(profile)
    }
}
