//! Auth decision engine for every `/auth/*` request.
//!
//! # Data Flow
//! ```text
//! /auth/* request (tenant already resolved by the gateway)
//!     → /auth/status           → "true" | "false"
//!     → GET /auth/assets/...   → assets.rs
//!     → GET /auth/login        → login page
//!     → /auth/logout           → session removed, 303 /auth/login
//!     → /auth/login (other)    → POST form → oauth::flow::begin_login
//!     → /auth/callback/<p>/<d> → oauth::flow::complete_callback → session issued
//!     → anything else          → 404
//! ```
//!
//! # Design Decisions
//! - Dispatch order is fixed; the first matching rule wins
//! - Recognised bad login input renders a 401 page; every other failure is
//!   returned as an `AuthError` for the gateway to render as a 500

pub mod assets;
pub mod pages;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::{DomainConfig, GatewayConfig, ResolveError};
use crate::http::response::{append_cookie, redirect};
use crate::oauth::{flow, state, ClientSettings, OAuthError, ProviderRegistry};
use crate::session::{intent, SessionError, SessionStore};

pub use assets::AssetService;
pub use pages::{DefaultPages, Page, PageRenderer, ProviderOption};

/// Every path under this prefix belongs to the engine.
pub const AUTH_PREFIX: &str = "/auth";

const STATUS_PATH: &str = "/auth/status";
const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";
const CALLBACK_PREFIX: &str = "/auth/callback/";

const DEFAULT_LOGIN_TITLE: &str = "Login";
const BAD_EMAIL_TITLE: &str = "Bad Email";

/// Failures of the auth engine.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect method")]
    BadMethod,

    #[error("Email address not recognised")]
    BadEmail,

    #[error("Provider not recognised")]
    BadProvider,

    #[error("{0}")]
    Tenant(String),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("unable to issue session: {0}")]
    Session(#[from] SessionError),

    #[error("failed reading request body: {0}")]
    Body(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl AuthError {
    /// Input problems the user can correct on the login page.
    fn is_bad_login(&self) -> bool {
        matches!(self, AuthError::BadEmail | AuthError::BadProvider)
    }
}

/// Handles `/auth/*` for every tenant.
///
/// Holds no tenant state; per-tenant values arrive with each call.
pub struct AuthEngine {
    providers: Arc<ProviderRegistry>,
    http: reqwest::Client,
    pages: Arc<dyn PageRenderer>,
    assets: AssetService,
    callback_scheme: String,
    secure_cookies: bool,
    max_body_size: usize,
}

impl AuthEngine {
    pub fn new(
        config: &GatewayConfig,
        providers: Arc<ProviderRegistry>,
        http: reqwest::Client,
        pages: Arc<dyn PageRenderer>,
    ) -> Self {
        Self {
            providers,
            http,
            pages,
            assets: AssetService::new(&config.asset_path),
            callback_scheme: config.callback_scheme.clone(),
            secure_cookies: config.secure_cookies,
            max_body_size: config.max_body_size,
        }
    }

    pub fn pages(&self) -> &dyn PageRenderer {
        self.pages.as_ref()
    }

    /// Dispatch one `/auth/*` request.
    pub async fn handle(
        &self,
        tenant: Result<&DomainConfig, &ResolveError>,
        request: Request<Body>,
    ) -> Result<Response, AuthError> {
        let path = request.uri().path().to_string();
        let method = request.method().clone();

        tracing::debug!(method = %method, path = %path, "Auth request");

        if path.starts_with(STATUS_PATH) {
            let valid = tenant
                .ok()
                .and_then(|dc| self.store(dc).check(request.headers()))
                .is_some();
            return Ok(status_response(valid));
        }

        if path.starts_with(assets::ASSETS_PREFIX) && method == Method::GET {
            return Ok(match self.assets.serve(request).await {
                Some(response) => response,
                None => self.not_found(),
            });
        }

        if path == LOGIN_PATH && method == Method::GET {
            let title = tenant
                .ok()
                .map(|dc| dc.auth_page_title.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_LOGIN_TITLE)
                .to_string();
            let page = Page::Login {
                title,
                providers: self.provider_options(),
            };
            return Ok(self.pages.respond(StatusCode::OK, &page));
        }

        if path == LOGOUT_PATH {
            let dc = tenant.map_err(tenant_error)?;
            let mut response = redirect(StatusCode::SEE_OTHER, LOGIN_PATH);
            append_cookie(response.headers_mut(), &self.store(dc).remove());
            tracing::info!(tenant = %dc.domain, "Session removed");
            return Ok(response);
        }

        if path == LOGIN_PATH {
            return self.login(tenant, request).await;
        }

        if let Some((provider, email_domain)) = path.strip_prefix(CALLBACK_PREFIX).and_then(callback_target) {
            return self.callback(tenant, &provider, &email_domain, request).await;
        }

        Ok(self.not_found())
    }

    async fn login(
        &self,
        tenant: Result<&DomainConfig, &ResolveError>,
        request: Request<Body>,
    ) -> Result<Response, AuthError> {
        if request.method() != Method::POST {
            return Err(AuthError::BadMethod);
        }
        let dc = tenant.map_err(tenant_error)?;
        let form = read_form(request.into_body(), self.max_body_size).await?;

        match self.begin_login(dc, &form) {
            Err(e) if e.is_bad_login() => {
                tracing::debug!(tenant = %dc.domain, reason = %e, "Rejected login");
                let page = Page::BadEmail {
                    title: BAD_EMAIL_TITLE.to_string(),
                    providers: self.provider_options(),
                };
                Ok(self.pages.respond(StatusCode::UNAUTHORIZED, &page))
            }
            other => other,
        }
    }

    fn begin_login(&self, dc: &DomainConfig, form: &[(String, String)]) -> Result<Response, AuthError> {
        let email = form_value(form, "email").ok_or(AuthError::BadEmail)?;
        let provider_id = form_value(form, "provider").ok_or(AuthError::BadProvider)?;

        let email_domain = match email.rsplit_once('@') {
            Some((_, suffix)) if !suffix.is_empty() => suffix.to_ascii_lowercase(),
            _ => return Err(AuthError::BadEmail),
        };

        let login = dc
            .login_email_domain(&email_domain, provider_id)
            .ok_or(AuthError::BadEmail)?;
        let provider = self.providers.get(provider_id).ok_or(AuthError::BadProvider)?;

        let settings = ClientSettings::new(&self.callback_scheme, dc, login);
        tracing::info!(
            tenant = %dc.domain,
            provider = %provider.id(),
            email_domain = %email_domain,
            "Starting login"
        );
        Ok(flow::begin_login(provider.as_ref(), &settings, self.secure_cookies)?)
    }

    async fn callback(
        &self,
        tenant: Result<&DomainConfig, &ResolveError>,
        provider_id: &str,
        email_domain: &str,
        request: Request<Body>,
    ) -> Result<Response, AuthError> {
        let dc = tenant.map_err(tenant_error)?;
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| AuthError::UnknownProvider(provider_id.to_string()))?;
        let login = dc
            .login_email_domain(email_domain, provider_id)
            .ok_or(AuthError::BadEmail)?;
        let settings = ClientSettings::new(&self.callback_scheme, dc, login);

        let (parts, body) = request.into_parts();
        let form = if parts.method == Method::POST {
            Some(
                axum::body::to_bytes(body, self.max_body_size)
                    .await
                    .map_err(|e| AuthError::Body(e.to_string()))?,
            )
        } else {
            None
        };
        let params = flow::CallbackParams::parse(parts.uri.query(), form.as_deref());

        let profile =
            flow::complete_callback(provider.as_ref(), &self.http, &settings, &parts.headers, &params).await?;

        let session_cookie = self.store(dc).issue(&parts.headers, provider.id(), &profile)?;
        let (target, intent_cookie) = intent::consume(&parts.headers, self.secure_cookies);

        let mut response = redirect(StatusCode::SEE_OTHER, &target);
        let headers = response.headers_mut();
        append_cookie(headers, &session_cookie);
        append_cookie(headers, &state::clear(self.secure_cookies));
        if let Some(cookie) = intent_cookie {
            append_cookie(headers, &cookie);
        }

        tracing::info!(tenant = %dc.domain, provider = %provider.id(), "Login completed");
        Ok(response)
    }

    fn store(&self, dc: &DomainConfig) -> SessionStore {
        SessionStore::for_tenant(dc, self.secure_cookies)
    }

    fn provider_options(&self) -> Vec<ProviderOption> {
        self.providers
            .providers()
            .iter()
            .map(|p| ProviderOption {
                id: p.id().to_string(),
                name: p.display_name().to_string(),
            })
            .collect()
    }

    fn not_found(&self) -> Response {
        self.pages.respond(StatusCode::NOT_FOUND, &Page::NotFound)
    }
}

fn tenant_error(e: &ResolveError) -> AuthError {
    AuthError::Tenant(e.to_string())
}

fn status_response(valid: bool) -> Response {
    let body = if valid { "true" } else { "false" };
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// `<provider>/<email domain>`, both lowercased. Anything else is not a callback.
fn callback_target(rest: &str) -> Option<(String, String)> {
    let mut segments = rest.split('/');
    let provider = segments.next().filter(|s| !s.is_empty())?;
    let email_domain = segments.next().filter(|s| !s.is_empty())?;
    if segments.next().is_some() {
        return None;
    }
    Some((provider.to_ascii_lowercase(), email_domain.to_ascii_lowercase()))
}

async fn read_form(body: Body, limit: usize) -> Result<Vec<(String, String)>, AuthError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AuthError::Body(e.to_string()))?;
    Ok(url::form_urlencoded::parse(&bytes).into_owned().collect())
}

/// First non-empty, trimmed value for `key`.
fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, TenantsFile};
    use crate::oauth::state::OAUTH_STATE_COOKIE;
    use crate::session::Session;
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};

    const TENANTS: &str = r#"
domains:
  - domain: example.com
    enabled: true
    auth_pages_title: Example Reports
    session_cookie_name: _example
    session_server_token: example-secret
    login_email_domains:
      - domain: known-domain
        provider: google
        oauth_client_id: client-id
        oauth_client_secret: client-secret
"#;

    fn tenant() -> DomainConfig {
        let file: TenantsFile = serde_yaml::from_str(TENANTS).unwrap();
        file.get("example.com").unwrap().clone()
    }

    fn engine() -> AuthEngine {
        let config = GatewayConfig {
            secure_cookies: false,
            ..GatewayConfig::default()
        };
        AuthEngine::new(
            &config,
            Arc::new(ProviderRegistry::with_defaults()),
            reqwest::Client::new(),
            Arc::new(DefaultPages),
        )
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_status_reflects_session() {
        let dc = tenant();
        let engine = engine();

        let response = engine
            .handle(Ok(&dc), request(Method::GET, "/auth/status", ""))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "false");

        let store = SessionStore::new("_example", Secret::new("example-secret"), false);
        let sealed = store.seal(&Session::new("google", "{}")).unwrap();
        let mut req = request(Method::GET, "/auth/status", "");
        req.headers_mut()
            .insert(COOKIE, HeaderValue::from_str(&format!("_example={}", sealed)).unwrap());
        let response = engine.handle(Ok(&dc), req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "true");
    }

    #[tokio::test]
    async fn test_login_page_uses_tenant_title() {
        let dc = tenant();
        let response = engine()
            .handle(Ok(&dc), request(Method::GET, "/auth/login", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Example Reports"));
    }

    #[tokio::test]
    async fn test_post_login_known_domain_redirects_to_google() {
        let dc = tenant();
        let response = engine()
            .handle(
                Ok(&dc),
                request(Method::POST, "/auth/login", "email=test%40known-domain&provider=google"),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = url::Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
        assert_eq!(location.host_str(), Some("accounts.google.com"));
        assert!(location
            .as_str()
            .contains("redirect_uri=https%3A%2F%2Fexample.com%2Fauth%2Fcallback%2Fgoogle%2Fknown-domain"));
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(OAUTH_STATE_COOKIE));
    }

    #[tokio::test]
    async fn test_post_login_unknown_domain_is_bad_email() {
        let dc = tenant();
        for body in [
            "email=test%40unknown-domain&provider=google",
            "email=&provider=google",
            "email=test%40known-domain&provider=",
            "email=no-at-sign&provider=google",
        ] {
            let response = engine()
                .handle(Ok(&dc), request(Method::POST, "/auth/login", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", body);
            assert!(!response.headers().contains_key(SET_COOKIE));
            assert!(body_text(response).await.contains("bad email"));
        }
    }

    #[tokio::test]
    async fn test_login_wrong_method() {
        let dc = tenant();
        let result = engine()
            .handle(Ok(&dc), request(Method::PUT, "/auth/login", ""))
            .await;
        assert!(matches!(result, Err(AuthError::BadMethod)));
    }

    #[tokio::test]
    async fn test_login_without_tenant_is_error() {
        let missing = ResolveError::UnknownDomain("nowhere.example".into());
        let result = engine()
            .handle(
                Err(&missing),
                request(Method::POST, "/auth/login", "email=test%40known-domain&provider=google"),
            )
            .await;
        assert!(matches!(result, Err(AuthError::Tenant(_))));
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let dc = tenant();
        let response = engine()
            .handle(Ok(&dc), request(Method::GET, "/auth/logout", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/auth/login");
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("_example=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_callback_with_bad_state_fails() {
        let dc = tenant();
        let mut req = request(Method::GET, "/auth/callback/google/known-domain?state=forged&code=abc", "");
        req.headers_mut().insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}=expected", OAUTH_STATE_COOKIE)).unwrap(),
        );
        let result = engine().handle(Ok(&dc), req).await;
        assert!(matches!(result, Err(AuthError::OAuth(OAuthError::StateMismatch))));
    }

    #[tokio::test]
    async fn test_callback_unknown_provider() {
        let dc = tenant();
        let result = engine()
            .handle(Ok(&dc), request(Method::GET, "/auth/callback/github/known-domain", ""))
            .await;
        assert!(matches!(result, Err(AuthError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_unknown_paths_are_not_found() {
        let dc = tenant();
        for path in ["/auth/other", "/auth/callback/google", "/auth/callback/google/a/b"] {
            let response = engine()
                .handle(Ok(&dc), request(Method::GET, path, ""))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        }
    }

    #[test]
    fn test_callback_target() {
        assert_eq!(
            callback_target("Google/Known-Domain"),
            Some(("google".into(), "known-domain".into()))
        );
        assert_eq!(callback_target("google/"), None);
        assert_eq!(callback_target(""), None);
    }
}
