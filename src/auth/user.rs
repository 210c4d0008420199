use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use super::{
    guard::guard,
    policy::Access,
    session::{Identity, SessionState},
};
use crate::{
    error::ApiError,
    models::{Role, User},
    repository::RepositoryState,
};

/// AuthUser
///
/// The fuller resolver used inside handlers that need the user's current record.
///
/// The identity comes from the verified token exactly as the edge gate sees it; the
/// database only supplies the fresh row. `id` and `role` are always the token's claims,
/// so the gate and the handler never disagree about who the caller is or what they may do.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub user: User,
}

impl AuthUser {
    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.id,
            role: self.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Token verification through the shared guard (401 when there is no valid session).
/// 2. Repository lookup of the subject (404 when the user no longer exists, 500 when
///    the lookup itself fails).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionState::from_ref(state);
        let identity = guard(parts, &sessions, Access::Authenticated)?;

        let repo = RepositoryState::from_ref(state);
        let user = repo.get_user(identity.subject_id).await?.ok_or_else(|| {
            tracing::info!(
                event = "session_user_missing",
                user_id = %identity.subject_id,
                "Session refers to a user that no longer exists"
            );
            ApiError::NotFound("User not found.".to_string())
        })?;

        if user.role != identity.role {
            tracing::debug!(
                user_id = %identity.subject_id,
                token_role = %identity.role,
                stored_role = %user.role,
                "stored role changed since login; token role applies until the session is renewed"
            );
        }

        Ok(AuthUser {
            id: identity.subject_id,
            role: identity.role,
            user,
        })
    }
}
