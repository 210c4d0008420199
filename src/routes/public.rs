use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, the login page and the credential
/// issuer. None of these paths match a protected prefix, so the gate lets them through.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer and monitoring probe.
        .route("/health", get(|| async { "ok" }))
        // GET /login?callbackUrl=...
        // Where the gate sends anonymous callers.
        .route("/login", get(handlers::login_page))
        // POST /api/auth/login
        // Verifies credentials and sets the session cookie.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/logout
        .route("/api/auth/logout", post(handlers::logout))
        // POST /api/auth/register
        // Self-service sign-up; always creates a client.
        .route("/api/auth/register", post(handlers::register))
        // GET /api/debug-auth
        // Session diagnostics, 404 unless enabled.
        .route("/api/debug-auth", get(handlers::debug_auth))
}
