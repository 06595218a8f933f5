//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use auth_route_service::config::GatewayConfig;
use auth_route_service::http::GatewayServer;
use auth_route_service::lifecycle::Shutdown;
use auth_route_service::oauth::{GoogleProvider, OAuthEndpoints, ProviderRegistry};

pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";
pub const MOCK_PROFILE: &str = r#"{"id":"1234","email":"test@known-domain","verified_email":true}"#;

/// A raw-TCP backend returning a fixed response and recording what it saw.
pub struct MockBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<String>>,
}

impl MockBackend {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request line and headers of the most recent request.
    pub fn last_request(&self) -> String {
        self.last_request.lock().unwrap().clone()
    }
}

/// Start a mock backend on an ephemeral port.
///
/// `extra_headers` is inserted verbatim into the response head and must end
/// in `\r\n` when non-empty.
pub async fn start_mock_backend(extra_headers: &'static str, body: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(String::new()));

    let (task_hits, task_last) = (hits.clone(), last_request.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let hits = task_hits.clone();
                    let last = task_last.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        hits.fetch_add(1, Ordering::SeqCst);
                        *last.lock().unwrap() = head;

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                            extra_headers,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend {
        addr,
        hits,
        last_request,
    }
}

/// A backend that accepts and reads requests but never answers.
pub async fn start_silent_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(String::new()));

    let task_hits = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let hits = task_hits.clone();
            tokio::spawn(async move {
                let _ = read_head(&mut socket).await;
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
            });
        }
    });

    MockBackend {
        addr,
        hits,
        last_request,
    }
}

/// A backend that reads a `Content-Length` body in full and answers with
/// the number of body bytes it received.
pub async fn start_body_counting_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(String::new()));

    let (task_hits, task_last) = (hits.clone(), last_request.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let hits = task_hits.clone();
            let last = task_last.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = vec![0u8; 64 * 1024];
                let head_end = loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };

                let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
                let expected = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);

                let mut received = buf.len() - head_end;
                while received < expected {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => received += n,
                    }
                }
                hits.fetch_add(1, Ordering::SeqCst);
                *last.lock().unwrap() = head;

                let body = received.to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockBackend {
        addr,
        hits,
        last_request,
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a mock OAuth provider exposing `/token` and `/userinfo`.
pub async fn start_mock_oauth_provider() -> SocketAddr {
    async fn token() -> impl IntoResponse {
        Json(serde_json::json!({
            "access_token": MOCK_ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600
        }))
    }

    async fn userinfo(headers: HeaderMap) -> impl IntoResponse {
        let expected = format!("Bearer {}", MOCK_ACCESS_TOKEN);
        match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
            Some(value) if value == expected => (StatusCode::OK, MOCK_PROFILE).into_response(),
            _ => StatusCode::UNAUTHORIZED.into_response(),
        }
    }

    let app = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Registry whose Google provider talks to the mock at `oauth_addr`.
pub fn mock_providers(oauth_addr: SocketAddr) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(GoogleProvider::with_endpoints(OAuthEndpoints {
        auth_url: format!("http://{}/authorize", oauth_addr),
        token_url: format!("http://{}/token", oauth_addr),
        userinfo_url: format!("http://{}/userinfo", oauth_addr),
    }));
    registry
}

pub fn tenants_file() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/example.yml")
}

/// Gateway settings for tests: example tenants, plain-HTTP cookies.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        bind_address: "127.0.0.1:0".into(),
        domain_config_path: Some(tenants_file()),
        secure_cookies: false,
        ..GatewayConfig::default()
    }
}

/// A running gateway. Dropping it shuts the server down.
pub struct TestGateway {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_gateway(config: GatewayConfig, providers: ProviderRegistry) -> TestGateway {
    let server = GatewayServer::with_providers(config, providers).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        _shutdown: shutdown,
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
