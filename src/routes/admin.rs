use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes reserved for the admin role.
///
/// Access Control:
/// `/admin` is an admin-only prefix, so the gate redirects anonymous callers to the
/// login page and clients to the landing page before these handlers run. The
/// `/api/admin/*` routes are outside the gated prefixes; every handler there takes the
/// `RequireAdmin` guard, which applies the same policy and answers 401 or 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Admin home with the client count.
        .route("/admin", get(handlers::admin_overview))
        // GET/POST /api/admin/clients
        // List (with ?search=) and create client accounts.
        .route(
            "/api/admin/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
}
