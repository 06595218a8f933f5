//! Gateway server.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (request ID, tracing)
//! - Classify every request: auth engine, forward, or redirect to login
//! - Re-apply CF proxy headers and security headers on every response
//! - Bind to a listener and stop on the shutdown signal
//!
//! # Design Decisions
//! - The tenant is resolved once per request from the forwarded host and
//!   passed down as an immutable value
//! - No retries: every failure produces exactly one terminal response
//! - The request deadline is enforced inside the round trip, so a timed-out
//!   request still gets the CF echo and security headers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::auth::{AuthEngine, DefaultPages, Page, PageRenderer, AUTH_PREFIX};
use crate::config::{resolver::decode_path, DomainConfig, DomainResolver, GatewayConfig};
use crate::http::request::{forwarded_url, request_target, rewrite, ProxyHeaders, RoutingError};
use crate::http::response::{append_cookie, ensure_private_cache_control, redirect};
use crate::http::upstream::{Upstream, UpstreamError};
use crate::lifecycle::ShutdownListener;
use crate::oauth::ProviderRegistry;
use crate::security::apply_security_headers;
use crate::session::{intent, SessionStore};

const LOGIN_PATH: &str = "/auth/login";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<DomainResolver>,
    pub auth: Arc<AuthEngine>,
    pub upstream: Upstream,
    pub config: Arc<GatewayConfig>,
}

/// The authenticating gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
}

impl GatewayServer {
    /// Gateway with the built-in providers and pages.
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        Self::with_providers(config, ProviderRegistry::with_defaults())
    }

    /// Gateway with a custom provider registry.
    pub fn with_providers(config: GatewayConfig, providers: ProviderRegistry) -> Result<Self, UpstreamError> {
        let upstream = Upstream::new(&config)?;
        let oauth_http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(UpstreamError::Client)?;

        let pages: Arc<dyn PageRenderer> = Arc::new(DefaultPages);
        let auth = AuthEngine::new(&config, Arc::new(providers), oauth_http, pages);

        let state = AppState {
            resolver: Arc::new(DomainResolver::new(config.domain_config_path.clone())),
            auth: Arc::new(auth),
            upstream,
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving on a custom listener or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tenants = ?self.config.domain_config_path,
            "Gateway starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Route-service round trip for every request.
async fn gateway_handler(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    let proxy_headers = ProxyHeaders::capture(request.headers());
    let request_id = request_id(request.headers());

    let target = match route(&mut request) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Unroutable request");
            let mut response = error_page(&state, StatusCode::BAD_REQUEST, &e);
            finish(&mut response, &proxy_headers, None);
            return response;
        }
    };

    let host = target.host_str().unwrap_or_default();
    let tenant = state.resolver.resolve(host);
    if let Err(e) = &tenant {
        tracing::warn!(request_id = %request_id, host = %host, error = %e, "Tenant not resolved");
    }

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        host = %host,
        path = %target.path(),
        "Gateway request"
    );

    let round_trip = async {
        if is_auth_path(target.path()) {
            match state.auth.handle(tenant.as_ref(), request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(request_id = %request_id, host = %host, error = %e, "Auth request failed");
                    error_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &e)
                }
            }
        } else {
            forward_or_login(&state, tenant.as_ref().ok(), &target, request, &request_id).await
        }
    };

    let deadline = Duration::from_secs(state.config.timeouts.request_secs);
    let mut response = match tokio::time::timeout(deadline, round_trip).await {
        Ok(response) => response,
        Err(_) => {
            let e = UpstreamError::Timeout(deadline.as_secs());
            tracing::error!(request_id = %request_id, host = %host, error = %e, "Request timed out");
            error_page(&state, StatusCode::GATEWAY_TIMEOUT, &e)
        }
    };

    finish(&mut response, &proxy_headers, tenant.as_ref().ok());
    response
}

fn route(request: &mut Request<Body>) -> Result<Url, RoutingError> {
    let target = forwarded_url(request.headers())?;
    rewrite(request, &target)?;
    Ok(target)
}

/// `/auth` itself or anything below it.
fn is_auth_path(escaped_path: &str) -> bool {
    match escaped_path.strip_prefix(AUTH_PREFIX) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Forward when the path is open or the session is valid, else send to login.
async fn forward_or_login(
    state: &AppState,
    tenant: Option<&DomainConfig>,
    target: &Url,
    request: Request<Body>,
    request_id: &str,
) -> Response {
    let secure = state.config.secure_cookies;
    let decoded = decode_path(target.path());

    if tenant.map_or(false, |dc| dc.allows_unauthenticated(&decoded)) {
        tracing::debug!(request_id = %request_id, path = %decoded, "Unauthenticated path");
        return match state.upstream.forward(request).await {
            Ok(response) => response,
            Err(e) => upstream_failure(state, request_id, e),
        };
    }

    let session = tenant.and_then(|dc| {
        let store = SessionStore::for_tenant(dc, secure);
        store.check(request.headers()).map(|session| (store, session))
    });

    let Some((store, session)) = session else {
        tracing::debug!(request_id = %request_id, "No valid session, redirecting to login");
        let mut response = redirect(StatusCode::SEE_OTHER, LOGIN_PATH);
        append_cookie(response.headers_mut(), &intent::stash(&request_target(target), secure));
        return response;
    };

    let intent_presented = intent::is_present(request.headers());
    let mut response = match state.upstream.forward(request).await {
        Ok(response) => response,
        Err(e) => return upstream_failure(state, request_id, e),
    };

    let headers = response.headers_mut();
    match store.renew(&session) {
        Ok(cookie) => append_cookie(headers, &cookie),
        Err(e) => tracing::warn!(request_id = %request_id, error = %e, "Session renewal failed"),
    }
    ensure_private_cache_control(headers);
    if intent_presented {
        append_cookie(headers, &intent::clear(secure));
    }
    response
}

fn upstream_failure(state: &AppState, request_id: &str, e: UpstreamError) -> Response {
    tracing::error!(request_id = %request_id, error = %e, "Upstream error");
    error_page(state, StatusCode::BAD_GATEWAY, &e)
}

fn error_page(state: &AppState, status: StatusCode, e: &dyn std::error::Error) -> Response {
    let page = Page::Error {
        message: e.to_string(),
    };
    state.auth.pages().respond(status, &page)
}

/// Headers every response carries, whichever branch produced it.
fn finish(response: &mut Response, proxy_headers: &ProxyHeaders, tenant: Option<&DomainConfig>) {
    let headers = response.headers_mut();
    proxy_headers.echo(headers);
    apply_security_headers(tenant, headers);
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
