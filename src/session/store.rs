//! Stateless session store backed by an encrypted cookie.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::config::{DomainConfig, Secret};
use crate::session::cipher::{self, CipherError};

/// Sliding session lifetime.
pub const SESSION_LIFETIME: Duration = Duration::hours(6);

/// The record carried inside the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Random, opaque identifier. Changes on every renewal.
    pub id: String,
    /// Absolute expiry as unix seconds. Authoritative over the cookie's `Expires`.
    pub expiry_time: i64,
    /// Provider that authenticated the session, empty until login.
    pub provider: String,
    /// Opaque provider profile payload.
    pub user_data: String,
}

impl Session {
    /// A new session expiring one lifetime from now.
    pub fn new(provider: impl Into<String>, user_data: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            expiry_time: (OffsetDateTime::now_utc() + SESSION_LIFETIME).unix_timestamp(),
            provider: provider.into(),
            user_data: user_data.into(),
        }
    }

    /// Same provider and profile under a new id and a fresh expiry.
    pub fn renewed(&self) -> Self {
        Self::new(self.provider.clone(), self.user_data.clone())
    }

    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.expiry_time > now.unix_timestamp()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to seal session: {0}")]
    Seal(#[from] CipherError),
}

/// Session operations for one tenant.
///
/// Built per request from the resolved `DomainConfig`; never shared across tenants.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cookie_name: String,
    secret: Secret,
    secure: bool,
}

impl SessionStore {
    pub fn new(cookie_name: impl Into<String>, secret: Secret, secure: bool) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secret,
            secure,
        }
    }

    pub fn for_tenant(dc: &DomainConfig, secure: bool) -> Self {
        Self::new(dc.session_cookie_name.clone(), dc.session_secret.clone(), secure)
    }

    /// Serialize and encrypt a session into a cookie value.
    pub fn seal(&self, session: &Session) -> Result<String, SessionError> {
        let json = serde_json::to_vec(session)?;
        Ok(cipher::encrypt(&json, self.secret.expose())?)
    }

    /// Decrypt and parse a cookie value, without checking expiry.
    pub fn open(&self, value: &str) -> Option<Session> {
        let plaintext = match cipher::decrypt(value, self.secret.expose()) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(cookie = %self.cookie_name, error = %e, "Session cookie rejected");
                return None;
            }
        };
        match serde_json::from_slice(&plaintext) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!(cookie = %self.cookie_name, error = %e, "Session payload rejected");
                None
            }
        }
    }

    /// The valid, unexpired session presented on a request, if any.
    ///
    /// Every failure (absent, undecryptable, unparseable, expired) is `None`.
    pub fn check(&self, headers: &HeaderMap) -> Option<Session> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(&self.cookie_name)?;
        if cookie.value().is_empty() {
            return None;
        }

        self.open(cookie.value())
            .filter(|session| session.is_valid_at(OffsetDateTime::now_utc()))
    }

    /// Issue a session cookie for a response.
    ///
    /// A valid session already on the request is renewed and keeps its
    /// provider and profile; otherwise a new session is created from the arguments.
    pub fn issue(
        &self,
        request_headers: &HeaderMap,
        provider: &str,
        user_data: &str,
    ) -> Result<Cookie<'static>, SessionError> {
        let session = match self.check(request_headers) {
            Some(existing) => existing.renewed(),
            None => Session::new(provider, user_data),
        };
        self.cookie_for(&session)
    }

    /// Renew a session already known to be valid.
    pub fn renew(&self, existing: &Session) -> Result<Cookie<'static>, SessionError> {
        self.cookie_for(&existing.renewed())
    }

    /// A cookie that overwrites the session with an empty, long-expired value.
    pub fn remove(&self) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), String::new()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::now_utc() - Duration::days(396))
            .build()
    }

    fn cookie_for(&self, session: &Session) -> Result<Cookie<'static>, SessionError> {
        let value = self.seal(session)?;
        let expires = OffsetDateTime::from_unix_timestamp(session.expiry_time)
            .unwrap_or_else(|_| OffsetDateTime::now_utc() + SESSION_LIFETIME);

        Ok(Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .expires(expires)
            .build())
    }
}
