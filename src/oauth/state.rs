//! CSRF state token bound to a login attempt.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use time::{Duration, OffsetDateTime};

use crate::oauth::OAuthError;

/// Cookie holding the state token between login and callback.
pub const OAUTH_STATE_COOKIE: &str = "oauthstate";

const STATE_LIFETIME: Duration = Duration::minutes(10);

/// A random state token.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfState(String);

impl CsrfState {
    /// 16 random bytes, base64url encoded.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Short-lived cookie carrying this token.
    pub fn cookie(&self, secure: bool) -> Cookie<'static> {
        Cookie::build((OAUTH_STATE_COOKIE, self.0.clone()))
            .path("/")
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .max_age(STATE_LIFETIME)
            .build()
    }
}

impl std::fmt::Debug for CsrfState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfState([redacted])")
    }
}

/// Compare the state cookie to the callback's `state` parameter.
///
/// A missing cookie, missing parameter, or any difference is fatal.
pub fn verify(headers: &HeaderMap, presented: Option<&str>) -> Result<(), OAuthError> {
    let jar = CookieJar::from_headers(headers);
    let expected = match jar.get(OAUTH_STATE_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value(),
        _ => {
            tracing::debug!("OAuth state cookie missing");
            return Err(OAuthError::StateMismatch);
        }
    };

    match presented {
        Some(state) if state == expected => Ok(()),
        _ => {
            tracing::debug!("OAuth state parameter does not match cookie");
            Err(OAuthError::StateMismatch)
        }
    }
}

/// A cookie that removes the state token.
pub fn clear(secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::now_utc() - Duration::days(1))
        .build()
}
