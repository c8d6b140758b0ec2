//! Page errors and the client-facing responses they turn into

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::secrets::SecretError;
use crate::templates::{TemplateError, TemplateStore};

/// Last resort when even the error template cannot be loaded.
const FALLBACK_ERROR_HTML: &str =
    "<!DOCTYPE html><html><body><h1>Server Error</h1></body></html>";

/// Errors that abort a request. Wrong passwords and bad sessions are not
/// errors: they re-show the login page.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Server misconfigured: {0}")]
    Configuration(#[from] SecretError),

    #[error("Template unavailable: {0}")]
    Template(#[from] TemplateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl PageError {
    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            PageError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PageError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Title shown to the client. Never includes internal detail.
    pub fn title(&self) -> &'static str {
        match self {
            PageError::NotFound(_) => "Not Found",
            _ => "Server Error",
        }
    }

    /// Message shown to the client. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            PageError::NotFound(_) => "The page you asked for does not exist.",
            _ => "The server is not configured correctly.",
        }
    }

    /// Log the error and render it with the error template.
    pub fn into_page(self, templates: &TemplateStore) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let body = match templates.error_page(self.title(), self.public_message()) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Could not render error page: {}", e);
                FALLBACK_ERROR_HTML.to_string()
            }
        };

        (status, [(header::CACHE_CONTROL, "no-store")], Html(body)).into_response()
    }
}
