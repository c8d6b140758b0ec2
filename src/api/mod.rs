//! HTTP surface: login pages, the protected page, and session cookies

mod errors;
pub mod handlers;

pub use errors::PageError;
pub use handlers::{AppState, SESSION_COOKIE};

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// The client IP comes from `ConnectInfo<SocketAddr>`, so the router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// Routes:
///   GET  /            - public page (protected content or public login)
///   GET  /admin       - admin page (protected content or admin login)
///   POST /login       - public login form
///   POST /admin/login - admin login form
///   POST /logout      - end the session
///   GET  /health      - liveness probe
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::public_page))
        .route("/admin", get(handlers::admin_page))
        .route("/login", post(handlers::public_login))
        .route("/admin/login", post(handlers::admin_login))
        .route("/logout", post(handlers::logout))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
