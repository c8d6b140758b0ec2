//! Request handlers
//!
//! Every page request follows the same decision:
//! - a valid session cookie for this client IP gets the protected page,
//! - a login form post with a password is checked against both tiers,
//! - anything else gets the tier's login page.
//!
//! Wrong passwords, missing cookies, expired sessions and IP mismatches all
//! look the same from outside: the login page.

use axum::extract::{ConnectInfo, Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::PageError;
use crate::secrets::{verify_password, SecretKind, SecretSource};
use crate::session::SessionStore;
use crate::templates::TemplateStore;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "birthday_session";

/// Shown on the login page after a failed attempt.
pub const LOGIN_FAILED_MESSAGE: &str = "Incorrect password.";

/// Application state shared across handlers
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub templates: TemplateStore,
    pub secrets: Arc<dyn SecretSource>,
    pub secure_cookie: bool,
}

impl AppState {
    fn has_valid_session(&self, headers: &HeaderMap, client_ip: IpAddr) -> bool {
        extract_session_token(headers)
            .map(|token| self.sessions.is_session_valid(&token, client_ip))
            .unwrap_or(false)
    }

    fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.sessions.ttl().num_seconds()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn cleared_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
            SESSION_COOKIE
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Page path for a tier, where logins redirect to.
fn tier_path(kind: SecretKind) -> &'static str {
    match kind {
        SecretKind::Public => "/",
        SecretKind::Admin => "/admin",
    }
}

/// GET /
pub async fn public_page(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    respond(&state, serve_page(&state, SecretKind::Public, addr.ip(), &headers))
}

/// GET /admin
pub async fn admin_page(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    respond(&state, serve_page(&state, SecretKind::Admin, addr.ip(), &headers))
}

/// POST /login
pub async fn public_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    form: Option<Form<LoginForm>>,
) -> Response {
    let password = form.and_then(|Form(f)| f.password);
    respond(
        &state,
        submit_login(&state, SecretKind::Public, addr.ip(), &headers, password),
    )
}

/// POST /admin/login
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    form: Option<Form<LoginForm>>,
) -> Response {
    let password = form.and_then(|Form(f)| f.password);
    respond(
        &state,
        submit_login(&state, SecretKind::Admin, addr.ip(), &headers, password),
    )
}

/// POST /logout: drop the session if this cookie owns it, and expire the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_session_token(&headers) {
        if state.sessions.remove(&token) {
            info!("Session ended by logout");
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, tier_path(SecretKind::Public).to_string()),
            (header::SET_COOKIE, state.cleared_cookie()),
        ],
    )
        .into_response()
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Fallback for unknown routes.
pub async fn not_found(State(state): State<Arc<AppState>>, uri: axum::http::Uri) -> Response {
    PageError::NotFound(uri.path().to_string()).into_page(&state.templates)
}

fn respond(state: &AppState, result: Result<Response, PageError>) -> Response {
    result.unwrap_or_else(|e| e.into_page(&state.templates))
}

fn serve_page(
    state: &AppState,
    kind: SecretKind,
    client_ip: IpAddr,
    headers: &HeaderMap,
) -> Result<Response, PageError> {
    if state.has_valid_session(headers, client_ip) {
        return protected_page(state);
    }
    send_login_page(state, kind, StatusCode::OK, "")
}

fn submit_login(
    state: &AppState,
    kind: SecretKind,
    client_ip: IpAddr,
    headers: &HeaderMap,
    password: Option<String>,
) -> Result<Response, PageError> {
    if state.has_valid_session(headers, client_ip) {
        return Ok(redirect(tier_path(kind)));
    }

    let Some(password) = password else {
        debug!(ip = %client_ip, tier = %kind, "Login post without password");
        return send_login_page(state, kind, StatusCode::OK, "");
    };

    match verify_password(state.secrets.as_ref(), &password)? {
        Some(matched) => {
            let token = state.sessions.create_session(client_ip);
            info!(ip = %client_ip, tier = %matched, "Login succeeded");
            Ok((
                StatusCode::SEE_OTHER,
                [
                    (header::LOCATION, tier_path(kind).to_string()),
                    (header::SET_COOKIE, state.session_cookie(&token)),
                ],
            )
                .into_response())
        }
        None => {
            warn!(ip = %client_ip, tier = %kind, "Login failed");
            send_login_page(state, kind, StatusCode::UNAUTHORIZED, LOGIN_FAILED_MESSAGE)
        }
    }
}

fn send_login_page(
    state: &AppState,
    kind: SecretKind,
    status: StatusCode,
    message: &str,
) -> Result<Response, PageError> {
    let html = state.templates.login_page(kind, message)?;
    Ok((status, [(header::CACHE_CONTROL, "no-store")], Html(html)).into_response())
}

fn protected_page(state: &AppState) -> Result<Response, PageError> {
    let html = state.templates.protected_page()?;
    Ok((
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store")],
        Html(html),
    )
        .into_response())
}

fn redirect(location: &'static str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
}

/// Extract the session token from the Cookie header(s).
fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(prefix.as_str())
                .filter(|value| !value.is_empty())
                .map(|value| value.to_string())
        })
}
