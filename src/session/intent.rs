//! Redirect intent: where to send the user after login.
//!
//! The original request target is stashed in a short-lived cookie when a
//! request is bounced to the login page, and consumed once the provider
//! callback succeeds.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

/// Cookie carrying the redirect intent.
pub const REDIRECT_INTENT_COOKIE: &str = "_redirectPath";

/// Lifetime of a stashed intent.
const INTENT_LIFETIME: Duration = Duration::minutes(10);

/// Fallback target when no usable intent is present.
pub const DEFAULT_TARGET: &str = "/";

/// Build the cookie stashing `request_uri` (path and query).
pub fn stash(request_uri: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((REDIRECT_INTENT_COOKIE, urlencoding::encode(request_uri).into_owned()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(INTENT_LIFETIME)
        .build()
}

/// Whether the request presented an intent cookie.
pub fn is_present(headers: &HeaderMap) -> bool {
    CookieJar::from_headers(headers).get(REDIRECT_INTENT_COOKIE).is_some()
}

/// Read the stashed target.
///
/// Returns the same-origin path to redirect to and, when a cookie was
/// presented, the cookie that clears it.
pub fn consume(headers: &HeaderMap, secure: bool) -> (String, Option<Cookie<'static>>) {
    let jar = CookieJar::from_headers(headers);
    match jar.get(REDIRECT_INTENT_COOKIE) {
        Some(cookie) => (target_from(cookie.value()), Some(clear(secure))),
        None => (DEFAULT_TARGET.to_string(), None),
    }
}

/// A cookie that removes the intent.
pub fn clear(secure: bool) -> Cookie<'static> {
    Cookie::build((REDIRECT_INTENT_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::now_utc() - Duration::days(1))
        .build()
}

/// Reduce a stored value to a same-origin path and query.
///
/// The jar has already percent-decoded the cookie value. Browsers drop
/// tabs and newlines from URLs, so any control character is rejected.
fn target_from(value: &str) -> String {
    if value.chars().any(|c| c.is_control()) {
        return DEFAULT_TARGET.to_string();
    }

    if value.starts_with('/') && !value.starts_with("//") && !value.starts_with("/\\") {
        return value.to_string();
    }

    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        _ => DEFAULT_TARGET.to_string(),
    }
}
