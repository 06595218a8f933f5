//! Login, bad-email, error and not-found pages.
//!
//! Rendering sits behind [`PageRenderer`] so deployments can swap the
//! markup without touching the decision engine.

use axum::http::StatusCode;
use axum::response::Response;

use crate::http::response::{escape_html, html};

/// Cache-Control for rendered pages.
pub const PAGE_CACHE_CONTROL: &str = "max-age=60, public";
const ERROR_CACHE_CONTROL: &str = "no-store";

const ASSETS_PATH: &str = "/auth/assets";

/// A provider offered on the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOption {
    pub id: String,
    pub name: String,
}

/// A page to render.
#[derive(Debug, Clone)]
pub enum Page {
    Login {
        title: String,
        providers: Vec<ProviderOption>,
    },
    BadEmail {
        title: String,
        providers: Vec<ProviderOption>,
    },
    Error {
        message: String,
    },
    NotFound,
}

/// Turns a [`Page`] into markup.
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &Page) -> String;

    /// Full response for `page` with `status`.
    fn respond(&self, status: StatusCode, page: &Page) -> Response {
        let cache_control = match page {
            Page::Login { .. } | Page::BadEmail { .. } => PAGE_CACHE_CONTROL,
            Page::Error { .. } | Page::NotFound => ERROR_CACHE_CONTROL,
        };
        html(status, self.render(page), cache_control)
    }
}

/// Built-in markup styled by the stylesheet under `/auth/assets`.
#[derive(Debug, Clone, Default)]
pub struct DefaultPages;

impl PageRenderer for DefaultPages {
    fn render(&self, page: &Page) -> String {
        match page {
            Page::Login { title, providers } => layout(title, &login_form(providers, false)),
            Page::BadEmail { title, providers } => layout(title, &login_form(providers, true)),
            Page::Error { message } => layout(
                "Error",
                &format!(
                    "<h1 class=\"govuk-heading-l\">Sorry, there is a problem</h1>\n<p class=\"govuk-body\">{}</p>",
                    escape_html(message)
                ),
            ),
            Page::NotFound => layout(
                "Not Found",
                "<h1 class=\"govuk-heading-l\">Page not found</h1>\n<p class=\"govuk-body\">Element not found</p>",
            ),
        }
    }
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <link rel="stylesheet" href="{assets}/main.css">
</head>
<body class="govuk-template__body">
  <main class="govuk-main-wrapper" id="main-content">
{content}
  </main>
</body>
</html>
"#,
        title = escape_html(title),
        assets = ASSETS_PATH,
        content = content,
    )
}

fn login_form(providers: &[ProviderOption], bad_email: bool) -> String {
    let (input_class, message) = if bad_email {
        (
            "govuk-input govuk-input--error",
            "<span class=\"govuk-error-message\" id=\"email-error\">Error: bad email, this address is not recognised</span>\n",
        )
    } else {
        ("govuk-input", "")
    };

    let provider_field = match providers {
        [] => String::new(),
        [only] => format!(
            "<input type=\"hidden\" name=\"provider\" value=\"{}\">\n",
            escape_html(&only.id)
        ),
        many => {
            let options: String = many
                .iter()
                .map(|p| {
                    format!(
                        "<option value=\"{}\">{}</option>",
                        escape_html(&p.id),
                        escape_html(&p.name)
                    )
                })
                .collect();
            format!(
                "<label class=\"govuk-label\" for=\"provider\">Sign in with</label>\n<select class=\"govuk-select\" id=\"provider\" name=\"provider\">{}</select>\n",
                options
            )
        }
    };

    format!(
        r#"<form method="post" action="/auth/login">
<label class="govuk-label" for="email">Email address</label>
{message}<input class="{input_class}" id="email" name="email" type="email" autocomplete="email">
{provider_field}<button class="govuk-button" type="submit">Continue</button>
</form>"#
    )
}
