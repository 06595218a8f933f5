//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit `tracing` events with structured fields
//!     → logging.rs (EnvFilter + fmt subscriber)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is attached to gateway log events
//! - tower-http's TraceLayer records one span per request

pub mod logging;
