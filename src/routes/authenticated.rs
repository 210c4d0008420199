use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes for any signed-in user. The pages sit under gated prefixes (`/today`,
/// `/dashboard`) and are redirected by the gate when there is no session. The
/// `/api/me` routes are not under a gated prefix; their handlers resolve the user
/// through the `AuthUser` extractor and answer 401 on their own.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /today
        // Client landing page; also where signed-in users without the admin role land.
        .route("/today", get(handlers::today_page))
        // GET /dashboard
        // Default destination after login.
        .route("/dashboard", get(handlers::dashboard_page))
        // GET/PATCH /api/me
        // The signed-in user's profile, read fresh from the repository.
        .route("/api/me", get(handlers::get_me).patch(handlers::update_me))
}
