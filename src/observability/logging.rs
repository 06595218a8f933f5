//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick the default level from the debug toggle
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the toggle when set
//! - Secrets never reach log fields; config types redact themselves

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "auth_route_service=debug,tower_http=debug"
    } else {
        "auth_route_service=info,tower_http=info"
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(debug: bool) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(debug).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
