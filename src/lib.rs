//! Authenticating route service library.

// Core subsystems
pub mod auth;
pub mod config;
pub mod http;
pub mod oauth;
pub mod session;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
