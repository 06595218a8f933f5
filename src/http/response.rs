//! Response construction helpers.
//!
//! # Responsibilities
//! - Redirects with a `Location` header and a meta-refresh body
//! - Attaching cookies without disturbing existing `Set-Cookie` values
//! - Cache-Control defaults for session-bearing responses
//!
//! # Design Decisions
//! - Helpers never panic on header encoding; a value that cannot be encoded
//!   is logged and skipped

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;

/// Cache-Control added to forwarded session-bearing responses lacking one.
pub const PRIVATE_CACHE_CONTROL: &str = "private, max-age=60";

/// Redirect to `location` with the given status.
pub fn redirect(status: StatusCode, location: &str) -> Response {
    let body = format!(
        "<head>\n  <meta http-equiv=\"refresh\" content=\"0; URL={}\" />\n</head>",
        escape_html(location)
    );

    let mut response = (status, body).into_response();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(e) => tracing::warn!(error = %e, "Redirect location is not a valid header value"),
    }
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    response
}

/// An HTML response.
pub fn html(status: StatusCode, body: String, cache_control: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    response
}

/// Append a `Set-Cookie` header.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(cookie = %cookie.name(), error = %e, "Cookie could not be encoded"),
    }
}

/// Add a private, short-lived Cache-Control unless one is already set.
pub fn ensure_private_cache_control(headers: &mut HeaderMap) {
    if !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(PRIVATE_CACHE_CONTROL));
    }
}

/// Minimal HTML escaping for text and attribute content.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
