//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Router (route service)
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (X-Cf-Forwarded-Url → URI + Host, CF headers captured)
//!     → auth engine | upstream.rs (forward to backend) | redirect to login
//!     → response.rs (cookies, cache-control, redirects)
//!     → CF headers echoed, security headers applied
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{ProxyHeaders, RoutingError};
pub use server::{AppState, GatewayServer};
pub use upstream::{Upstream, UpstreamError};
