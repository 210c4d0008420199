use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Role
///
/// The one role type used everywhere: token claims, the `users.role` column,
/// the edge gate and the handler guards. An unknown value in a token fails
/// deserialization, so the token is treated as absent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
    sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// A row of the `users` table. Never serialized directly: the password hash
/// stays server-side and the API exposes `UserProfile` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for the repository. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub password_hash: String,
}

// --- Response Payloads (Output Schemas) ---

/// UserProfile
///
/// Public view of a user, returned by login, `/api/me` and the admin client list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// LoginResponse
///
/// Returned alongside the `Set-Cookie` header after a successful login.
/// `redirect_to` is the sanitized callback target the client should navigate to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub redirect_to: String,
}

/// LoginPage
///
/// Data the login page needs: where to post credentials and where to go afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPage {
    pub action: String,
    pub callback_url: String,
}

/// LandingPage
///
/// Client landing view (`/today`, `/dashboard`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LandingPage {
    pub page: String,
    pub greeting: String,
    pub user: UserProfile,
}

/// AdminOverview
///
/// Admin home view (`/admin`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminOverview {
    pub client_count: i64,
}

/// OkResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OkResponse {
    pub ok: bool,
}

/// DebugAuthResponse
///
/// Session diagnostics. Reports which configuration values are present, never the values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DebugAuthResponse {
    pub has_session: bool,
    pub user_id: Option<Uuid>,
    pub role: Option<Role>,
    pub env: DebugAuthEnv,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DebugAuthEnv {
    pub has_database_url: bool,
    pub has_session_secret: bool,
    pub secure_cookie: bool,
    pub is_production: bool,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Credentials for POST /api/auth/login. Fields are optional so that missing
/// values produce the same 401 as wrong ones instead of a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub callback_url: Option<String>,
}

/// RegisterRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// CreateClientRequest
///
/// Admin payload for POST /api/admin/clients.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateClientRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// UpdateMeRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
}
