//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! bootstrap flags / env
//!     → GatewayConfig (immutable, shared via Arc)
//!
//! every request:
//!     resolver.rs (hostname of the forwarded URL)
//!     → loader.rs (read & parse tenant YAML)
//!     → validation.rs (semantic checks)
//!     → DomainConfig (owned by the request)
//! ```
//!
//! # Design Decisions
//! - The tenant file is re-read on each resolution; edits take effect immediately
//! - Resolution never caches secrets across requests or tenants
//! - Validation separates syntactic (serde) from semantic checks
//! - Every failure is fail-closed: no tenant means no open paths and no session

pub mod loader;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use resolver::{DomainResolver, PathPattern, ResolveError};
pub use schema::{DomainConfig, GatewayConfig, LoginEmailDomain, Secret, TenantsFile, TimeoutConfig};
