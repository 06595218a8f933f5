//! Encrypted, stateless session subsystem.
//!
//! # Data Flow
//! ```text
//! Request cookie (tenant-named)
//!     → cipher.rs (base64 → nonce ‖ AES-256-GCM → JSON)
//!     → store.rs (expiry check → Session | invalid)
//!
//! Response:
//!     store.rs (new or renewed Session → JSON)
//!     → cipher.rs (seal)
//!     → Set-Cookie (HttpOnly, Path=/, 6h sliding expiry)
//! ```
//!
//! # Design Decisions
//! - No server-side session table; the cookie is the only copy
//! - Every decrypt/parse/expiry failure collapses to "no session"
//! - The encrypted expiry is authoritative; the cookie attribute is a hint
//! - intent.rs carries the post-login redirect target in its own cookie

pub mod cipher;
pub mod intent;
pub mod store;

pub use store::{Session, SessionError, SessionStore, SESSION_LIFETIME};
