//! Backend transport.
//!
//! Forwards a rewritten request to its absolute target, streaming the
//! body both ways. One attempt per request; no retries.

use std::time::Duration;

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{header, HeaderMap, Request},
    response::Response,
};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::GatewayConfig;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Request body chunks buffered between the client and backend connections.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Failures reaching the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed building backend client: {0}")]
    Client(reqwest::Error),

    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed building response: {0}")]
    Response(String),

    #[error("request did not complete within {0}s")]
    Timeout(u64),
}

/// HTTP client for the backend.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
}

impl Upstream {
    pub fn new(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        if config.skip_tls_validation {
            tracing::warn!("TLS certificate validation disabled for backend requests");
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.skip_tls_validation)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self { client })
    }

    /// Send `request` to the absolute URI it carries.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response, UpstreamError> {
        let (parts, body) = request.into_parts();

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        tracing::debug!(method = %parts.method, uri = %parts.uri, "Forwarding to backend");

        let mut outbound = self
            .client
            .request(parts.method, parts.uri.to_string())
            .headers(headers);
        if !body.is_end_stream() {
            outbound = outbound.body(streaming_body(body));
        }
        let backend = outbound.send().await?;

        let status = backend.status();
        let mut response_headers = backend.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::builder()
            .status(status)
            .body(Body::from_stream(backend.bytes_stream()))
            .map_err(|e| UpstreamError::Response(e.to_string()))?;
        *response.headers_mut() = response_headers;

        tracing::debug!(status = %status, "Backend responded");
        Ok(response)
    }
}

/// Hand the inbound body to reqwest chunk by chunk.
///
/// axum bodies are not `Sync`, so chunks cross a bounded channel.
fn streaming_body(body: Body) -> reqwest::Body {
    let (tx, mut rx) = mpsc::channel::<Result<Bytes, axum::Error>>(BODY_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut chunks = body.into_data_stream();
        while let Some(chunk) = chunks.next().await {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });

    reqwest::Body::wrap_stream(futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx)))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_error() {
        let upstream = Upstream::new(&GatewayConfig::default()).unwrap();
        let request = Request::builder()
            .uri("http://127.0.0.1:1/")
            .body(Body::empty())
            .unwrap();
        assert!(matches!(
            upstream.forward(request).await,
            Err(UpstreamError::Request(_))
        ));
    }
}
