//! Route-service request handling.
//!
//! # Responsibilities
//! - Extract the true target from `X-Cf-Forwarded-Url`
//! - Rewrite the request URI and `Host` to that target
//! - Capture the CF proxy headers so every response can echo them
//!
//! # Design Decisions
//! - A missing or unusable forwarded URL is fatal; there is no fallback to
//!   the request line
//! - The rewrite is the only mutation made before the auth decision

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri},
};
use thiserror::Error;
use url::Url;

/// Target URL inserted by the router.
pub const CF_FORWARDED_URL_HEADER: HeaderName = HeaderName::from_static("x-cf-forwarded-url");

/// Opaque router signature, echoed on responses.
pub const CF_PROXY_SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-cf-proxy-signature");

/// Opaque router metadata, echoed on responses.
pub const CF_PROXY_METADATA_HEADER: HeaderName = HeaderName::from_static("x-cf-proxy-metadata");

/// Failures to determine where a request is going.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("missing X-Cf-Forwarded-Url header")]
    MissingForwardedUrl,

    #[error("invalid X-Cf-Forwarded-Url header: {0}")]
    InvalidForwardedUrl(String),
}

/// The absolute target URL of a route-service request.
pub fn forwarded_url(headers: &HeaderMap) -> Result<Url, RoutingError> {
    let raw = headers
        .get(CF_FORWARDED_URL_HEADER)
        .ok_or(RoutingError::MissingForwardedUrl)?
        .to_str()
        .map_err(|_| RoutingError::InvalidForwardedUrl("not visible ASCII".into()))?;

    let mut url = Url::parse(raw).map_err(|e| RoutingError::InvalidForwardedUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RoutingError::InvalidForwardedUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(RoutingError::InvalidForwardedUrl("no host".into()));
    }
    url.set_fragment(None);
    Ok(url)
}

/// Point `request` at `target`: absolute URI plus matching `Host`.
pub fn rewrite(request: &mut Request<Body>, target: &Url) -> Result<(), RoutingError> {
    let uri = Uri::try_from(target.as_str()).map_err(|e| RoutingError::InvalidForwardedUrl(e.to_string()))?;

    let host = match (target.host_str(), target.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(RoutingError::InvalidForwardedUrl("no host".into())),
    };
    let host = HeaderValue::from_str(&host).map_err(|e| RoutingError::InvalidForwardedUrl(e.to_string()))?;

    *request.uri_mut() = uri;
    request.headers_mut().insert(header::HOST, host);
    Ok(())
}

/// Path and query of `target`, still percent-encoded.
pub fn request_target(target: &Url) -> String {
    match target.query() {
        Some(query) => format!("{}?{}", target.path(), query),
        None => target.path().to_string(),
    }
}

/// CF proxy headers presented on the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyHeaders {
    signature: Option<HeaderValue>,
    metadata: Option<HeaderValue>,
}

impl ProxyHeaders {
    pub fn capture(headers: &HeaderMap) -> Self {
        Self {
            signature: headers.get(CF_PROXY_SIGNATURE_HEADER).cloned(),
            metadata: headers.get(CF_PROXY_METADATA_HEADER).cloned(),
        }
    }

    /// Copy the captured values onto a response. Absent ones stay absent.
    pub fn echo(&self, headers: &mut HeaderMap) {
        if let Some(signature) = &self.signature {
            headers.insert(CF_PROXY_SIGNATURE_HEADER, signature.clone());
        }
        if let Some(metadata) = &self.metadata {
            headers.insert(CF_PROXY_METADATA_HEADER, metadata.clone());
        }
    }
}
