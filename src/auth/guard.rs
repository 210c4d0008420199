//! Handler-level guards.
//!
//! Each guard resolves the session token with the same `SessionKeys` the edge gate uses
//! and then applies the same `authorize` policy. Only the presentation differs: a denial
//! becomes a JSON 401 (no session) or 403 (wrong role) instead of a redirect.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;

use super::{
    policy::{Access, Denial, authorize},
    session::{Identity, SessionState},
};
use crate::error::ApiError;

/// Any signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth(pub Identity);

/// Signed-in admins only.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Identity);

/// Signed-in clients only. Admins are refused with 403.
#[derive(Debug, Clone, Copy)]
pub struct RequireClient(pub Identity);

/// Never rejects; `None` for anonymous requests.
#[derive(Debug, Clone, Copy)]
pub struct MaybeIdentity(pub Option<Identity>);

/// guard
///
/// Resolve and authorize in one step, logging denials the way the rest of the
/// auth events are logged.
pub fn guard(parts: &Parts, sessions: &SessionState, access: Access) -> Result<Identity, ApiError> {
    let identity = sessions.resolve(&parts.headers);
    match (authorize(access, identity.as_ref()), identity) {
        (Ok(()), Some(identity)) => Ok(identity),
        // Public access with no session: a guard was asked for an identity it cannot give.
        (Ok(()), None) | (Err(Denial::Unauthenticated), _) => {
            tracing::info!(
                event = "auth_required",
                status = 401,
                path = %parts.uri.path(),
                "Unauthorized request"
            );
            Err(ApiError::Unauthorized)
        }
        (Err(Denial::RoleMismatch), identity) => {
            let event = match access {
                Access::Client => "client_required",
                _ => "admin_required",
            };
            tracing::info!(
                event,
                status = 403,
                path = %parts.uri.path(),
                user_id = ?identity.map(|i| i.subject_id),
                role = ?identity.map(|i| i.role),
                "Role not permitted"
            );
            Err(ApiError::Forbidden)
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        guard(parts, &sessions, Access::Authenticated).map(RequireAuth)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        guard(parts, &sessions, Access::Admin).map(RequireAdmin)
    }
}

impl<S> FromRequestParts<S> for RequireClient
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        guard(parts, &sessions, Access::Client).map(RequireClient)
    }
}

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        Ok(MaybeIdentity(sessions.resolve(&parts.headers)))
    }
}
