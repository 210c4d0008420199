use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session gating: classification, tokens, policy, gate middleware and guards.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Route groups (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{SessionKeys, SessionState};
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler and schema, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login_page, handlers::login, handlers::logout, handlers::register,
        handlers::get_me, handlers::update_me, handlers::debug_auth,
        handlers::today_page, handlers::dashboard_page, handlers::admin_overview,
        handlers::list_clients, handlers::create_client
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::LoginRequest, models::LoginResponse,
            models::LoginPage, models::RegisterRequest, models::OkResponse,
            models::UpdateMeRequest, models::CreateClientRequest, models::LandingPage,
            models::AdminOverview, models::DebugAuthResponse, models::DebugAuthEnv,
        )
    ),
    tags(
        (name = "coaching-portal", description = "Coaching portal session and identity API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the repository, the
/// session signing keys and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for user records. Never consulted by the gate.
    pub repo: RepositoryState,
    /// Signing keys and cookie settings, built once at startup.
    pub sessions: SessionState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state, refusing to start without a usable signing secret.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, auth::SessionError> {
        let sessions = std::sync::Arc::new(SessionKeys::new(&config.session)?);
        Ok(Self {
            repo,
            sessions,
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the route groups, puts the session gate in front of all of them and
/// wraps the result in the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");
    // The gate only needs the signing keys, never the repository.
    let sessions = state.sessions.clone();

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: login, logout, register, health, debug.
        .merge(public::public_routes())
        // Authenticated Routes: gated pages plus /api/me, which resolves the user itself.
        .merge(authenticated::authenticated_routes())
        // Admin Routes: /admin is gated; /api/admin/* carries the RequireAdmin guard.
        .merge(admin::admin_routes())
        // Apply the Unified State to all routes.
        .with_state(state)
        // 3. Session Gate
        // Runs before any handler, including the 404 fallback, so unknown paths under
        // a protected prefix are gated like known ones.
        .layer(middleware::from_fn_with_state(sessions, auth::gate::enforce));

    // 4. Observability and Correlation Layers (Applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: one span per request, carrying the request ID,
                // so gate redirects and login events correlate with the request line.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echo x-request-id back to the caller.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer (Applied last)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, carrying the `x-request-id` so all log lines of one
/// request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
