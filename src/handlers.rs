use crate::{
    AppState,
    auth::{
        AuthUser, MaybeIdentity, RequireAdmin,
        password::{MIN_PASSWORD_LEN, hash_password, verify_password},
    },
    error::ApiError,
    models::{
        AdminOverview, CreateClientRequest, DebugAuthEnv, DebugAuthResponse, LandingPage,
        LoginPage, LoginRequest, LoginResponse, NewUser, OkResponse, RegisterRequest, Role,
        UpdateMeRequest, User, UserProfile,
    },
    repository::{RepositoryError, RepositoryState},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use url::Url;

/// Where a successful login lands when no usable callback was supplied.
pub const DEFAULT_AFTER_LOGIN: &str = "/dashboard";

// --- Query Structs ---

/// LoginPageQuery
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LoginPageQuery {
    /// Target the gate wants the caller returned to after login.
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// ClientFilter
///
/// Query parameters for GET /api/admin/clients.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct ClientFilter {
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

// --- Helpers ---

/// sanitize_callback
///
/// Only same-origin paths are honoured. The target must start with a single `/`,
/// carry no backslash or control character, and still resolve to the portal's own
/// origin once parsed the way a browser would. Anything else falls back to the
/// default page.
pub fn sanitize_callback(callback: Option<&str>) -> String {
    callback
        .map(str::trim)
        .filter(|target| is_local_path(target))
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_AFTER_LOGIN.to_string())
}

/// Placeholder origin callbacks are resolved against.
const CALLBACK_BASE: &str = "http://portal.invalid/";

fn is_local_path(target: &str) -> bool {
    // URL parsers drop tabs and newlines, so "/\n/host" would become "//host".
    if !target.starts_with('/')
        || target.starts_with("//")
        || target.contains('\\')
        || target.chars().any(char::is_control)
    {
        return false;
    }
    let Ok(base) = Url::parse(CALLBACK_BASE) else {
        return false;
    };
    base.join(target)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Email and password as submitted to login; `None` when either is absent or empty.
fn login_credentials(
    email: Option<String>,
    password: Option<String>,
) -> Option<(String, String)> {
    Some((non_empty(email)?, password.filter(|p| !p.is_empty())?))
}

/// Validate, hash and insert a new client-role account.
async fn create_client_account(
    repo: &RepositoryState,
    email: Option<String>,
    name: Option<String>,
    password: Option<String>,
) -> Result<Result<User, RepositoryError>, ApiError> {
    let (Some(email), Some(password)) = (non_empty(email), password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        tracing::error!("password hashing error: {}", e);
        ApiError::Internal("Account creation failed.".to_string())
    })?;

    Ok(repo
        .create_user(NewUser {
            email,
            name: non_empty(name),
            role: Role::Client,
            password_hash,
        })
        .await)
}

// --- Credential Issuer ---

/// login_page
///
/// [Public Route] Describes the login form and the callback the caller will be sent to.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginPageQuery),
    responses((status = 200, description = "Login form target", body = LoginPage))
)]
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Json<LoginPage> {
    Json(LoginPage {
        action: "/api/auth/login".to_string(),
        callback_url: sanitize_callback(query.callback_url.as_deref()),
    })
}

/// login
///
/// [Public Route] Verifies email and password and issues the signed session cookie.
/// The token carries the `sub` and `role` claims every resolver reads.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = LoginResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Some((email, password)) = login_credentials(payload.email, payload.password) else {
        tracing::info!(event = "login_failed", reason = "missing_credentials", "Login failed");
        return Err(ApiError::InvalidCredentials);
    };

    let Some(user) = state.repo.get_user_by_email(&email).await? else {
        tracing::info!(event = "login_failed", email = %email, reason = "user_not_found", "Login failed");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&password, &user.password_hash) {
        tracing::info!(event = "login_failed", email = %email, reason = "invalid_password", "Login failed");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .sessions
        .issue(user.id, user.role)
        .map_err(|e| {
            tracing::error!("token signing error: {}", e);
            ApiError::Internal("Login failed.".to_string())
        })?;

    tracing::info!(
        event = "login_success",
        user_id = %user.id,
        email = %user.email,
        role = %user.role,
        "Login success"
    );

    let jar = jar.add(state.sessions.session_cookie(token));
    Ok((
        jar,
        Json(LoginResponse {
            user: user.into(),
            redirect_to: sanitize_callback(payload.callback_url.as_deref()),
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Idempotent.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (
        StatusCode::NO_CONTENT,
        jar.remove(state.sessions.removal_cookie()),
    )
}

/// register
///
/// [Public Route] Self-service sign-up. New accounts always get the client role.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = OkResponse),
        (status = 400, description = "Missing fields or short password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    let created = create_client_account(
        &state.repo,
        payload.email.clone(),
        payload.name,
        payload.password,
    )
    .await?;

    match created {
        Ok(user) => {
            tracing::info!(event = "register_success", user_id = %user.id, email = %user.email, "Register success");
            Ok(Json(OkResponse { ok: true }))
        }
        Err(RepositoryError::EmailTaken) => {
            tracing::info!(
                event = "register_failed",
                email = ?payload.email,
                reason = "email_exists",
                "Register failed: email already exists"
            );
            Err(ApiError::Conflict(
                "An account with this email already exists.".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

// --- Signed-in User ---

/// get_me
///
/// [Authenticated Route] Profile of the signed-in user, read fresh from the repository.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn get_me(auth: AuthUser) -> Json<UserProfile> {
    Json(auth.user.into())
}

/// update_me
///
/// [Authenticated Route] Updates the display name. An empty name clears it.
#[utoipa::path(
    patch,
    path = "/api/me",
    request_body = UpdateMeRequest,
    responses((status = 200, description = "Updated", body = UserProfile))
)]
pub async fn update_me(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    state
        .repo
        .update_user_name(auth.id, non_empty(payload.name))
        .await?
        .map(|user| Json(user.into()))
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

/// debug_auth
///
/// [Public Route] Session diagnostics. Answers 404 unless DEBUG_AUTH=1 or running locally.
#[utoipa::path(
    get,
    path = "/api/debug-auth",
    responses(
        (status = 200, description = "Diagnostics", body = DebugAuthResponse),
        (status = 404, description = "Not enabled")
    )
)]
pub async fn debug_auth(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
) -> Result<Json<DebugAuthResponse>, ApiError> {
    if !state.config.debug_auth_enabled() {
        return Err(ApiError::NotFound("Not enabled".to_string()));
    }

    Ok(Json(DebugAuthResponse {
        has_session: identity.is_some(),
        user_id: identity.map(|i| i.subject_id),
        role: identity.map(|i| i.role),
        env: DebugAuthEnv {
            has_database_url: !state.config.db_url.is_empty(),
            has_session_secret: !state.config.session.secret.is_empty(),
            secure_cookie: state.config.session.secure_cookie,
            is_production: state.config.env == crate::config::Env::Production,
        },
    }))
}

// --- Pages (behind the gate) ---

fn landing(page: &str, auth: AuthUser) -> Json<LandingPage> {
    let greeting = format!(
        "Welcome back, {}",
        auth.user.name.as_deref().unwrap_or(&auth.user.email)
    );
    Json(LandingPage {
        page: page.to_string(),
        greeting,
        user: auth.user.into(),
    })
}

/// today_page
///
/// [Gated Page] Client landing page, and where role mismatches are sent.
#[utoipa::path(
    get,
    path = "/today",
    responses(
        (status = 200, description = "Landing", body = LandingPage),
        (status = 303, description = "No session: redirect to login")
    )
)]
pub async fn today_page(auth: AuthUser) -> Json<LandingPage> {
    landing("today", auth)
}

/// dashboard_page
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = LandingPage))
)]
pub async fn dashboard_page(auth: AuthUser) -> Json<LandingPage> {
    landing("dashboard", auth)
}

/// admin_overview
///
/// [Admin Page] The gate already redirected anyone who is not an admin; the guard
/// repeats the check for callers that reach the handler some other way.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Overview", body = AdminOverview),
        (status = 303, description = "Redirect to login or landing")
    )
)]
pub async fn admin_overview(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<AdminOverview> {
    Json(AdminOverview {
        client_count: state.repo.count_clients().await,
    })
}

// --- Admin API ---

/// list_clients
///
/// [Admin Route] All client accounts, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/clients",
    params(ClientFilter),
    responses(
        (status = 200, description = "Clients", body = [UserProfile]),
        (status = 401, description = "No session"),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_clients(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(filter): Query<ClientFilter>,
) -> Json<Vec<UserProfile>> {
    let clients = state.repo.list_clients(filter.search).await;
    Json(clients.into_iter().map(UserProfile::from).collect())
}

/// create_client
///
/// [Admin Route] Creates a client account with the given password.
#[utoipa::path(
    post,
    path = "/api/admin/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 200, description = "Created", body = UserProfile),
        (status = 400, description = "Missing email or short password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_client(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = create_client_account(
        &state.repo,
        payload.email,
        payload.name,
        payload.password,
    )
    .await??;

    tracing::info!(
        event = "client_created",
        user_id = %user.id,
        admin_id = %admin.subject_id,
        "Client created"
    );
    Ok(Json(user.into()))
}
