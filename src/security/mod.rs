//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Every outgoing response (forwarded, redirected, auth, error):
//!     → headers.rs (owned security headers, tenant overrides applied)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - Pure function of (tenant, header name); no process-wide cache
//! - No tenant means defaults, never "no headers"

pub mod headers;

pub use headers::{apply_security_headers, effective_value, SUPPRESS_SENTINEL};
