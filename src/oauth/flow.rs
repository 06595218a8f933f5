//! The two phases of the authorization-code flow.
//!
//! Login: state token → cookie → 303 to the provider.
//! Callback: cookie vs `state` → code exchange → profile fetch.

use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;

use crate::http::response;
use crate::oauth::{state, ClientSettings, CsrfState, OAuthError, Provider};

/// `state` and `code` from a provider callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
}

impl CallbackParams {
    /// Collect parameters from the query string and an urlencoded form body.
    ///
    /// Form values win over query values.
    pub fn parse(query: Option<&str>, form: Option<&[u8]>) -> Self {
        let mut params = Self::default();
        let query_pairs = query.map(|q| url::form_urlencoded::parse(q.as_bytes()));
        let form_pairs = form.map(url::form_urlencoded::parse);

        for pair in query_pairs.into_iter().flatten().chain(form_pairs.into_iter().flatten()) {
            match pair.0.as_ref() {
                "state" => params.state = Some(pair.1.into_owned()),
                "code" => params.code = Some(pair.1.into_owned()),
                _ => {}
            }
        }
        params
    }
}

/// Start a login: set the state cookie and redirect to the provider.
pub fn begin_login(
    provider: &dyn Provider,
    settings: &ClientSettings,
    secure_cookies: bool,
) -> Result<Response, OAuthError> {
    let csrf = CsrfState::generate();
    let authorization_url = provider.begin_login(settings, &csrf)?;

    tracing::debug!(
        provider = %provider.id(),
        redirect_url = %settings.redirect_url,
        "Redirecting to provider"
    );

    let mut response = response::redirect(StatusCode::SEE_OTHER, authorization_url.as_str());
    response::append_cookie(response.headers_mut(), &csrf.cookie(secure_cookies));
    Ok(response)
}

/// Finish a login: verify state, then obtain the user's profile.
///
/// Returns the raw profile payload. Nothing here is retried.
pub async fn complete_callback(
    provider: &dyn Provider,
    http: &reqwest::Client,
    settings: &ClientSettings,
    request_headers: &HeaderMap,
    params: &CallbackParams,
) -> Result<String, OAuthError> {
    state::verify(request_headers, params.state.as_deref())?;

    let code = params
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(OAuthError::MissingCode)?;

    let profile = provider.complete_callback(http, settings, code).await?;
    if profile.is_empty() {
        return Err(OAuthError::EmptyProfile);
    }
    Ok(profile)
}
