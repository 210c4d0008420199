use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{config::SessionConfig, models::Role};

/// Claims
///
/// Payload of the signed session token. Written at login, read by both the edge
/// gate and the handler-level resolvers, so `sub` and `role` mean the same thing
/// at every enforcement point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    /// The user's role at login time.
    pub role: Role,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds). Tokens past this are treated as absent.
    pub exp: i64,
}

/// Identity
///
/// The verified subject and role of a request. Lives for one request only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub,
            role: claims.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session signing secret is missing")]
    MissingSecret,
    #[error("failed to sign session token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// SessionKeys
///
/// Signing material and cookie settings, built once at startup from `SessionConfig`
/// and shared read-only. Token verification needs nothing else: no database, no
/// password hashing.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    cookie_name: String,
    max_age_secs: u64,
    secure_cookie: bool,
}

/// SessionState
///
/// How the keys are shared through `AppState`.
pub type SessionState = Arc<SessionKeys>;

impl SessionKeys {
    /// Fails when the secret is empty: a process without a signing key must not serve
    /// authenticated routes at all.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        if config.secret.trim().is_empty() {
            return Err(SessionError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            cookie_name: config.cookie_name.clone(),
            max_age_secs: config.max_age_secs,
            secure_cookie: config.secure_cookie,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// issue
    ///
    /// Signs a token for `subject_id` valid for the configured max age.
    pub fn issue(&self, subject_id: Uuid, role: Role) -> Result<String, SessionError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject_id,
            role,
            iat: now,
            exp: now.saturating_add(self.max_age_i64()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// verify
    ///
    /// Checks signature and expiry. Every failure means "no session".
    pub fn verify(&self, token: &str) -> Option<Identity> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    kind => tracing::debug!(?kind, "session token rejected"),
                }
                None
            }
        }
    }

    /// resolve
    ///
    /// The lightweight resolver run by the edge gate and the handler guards.
    /// A `Bearer` token in the Authorization header wins over the session cookie.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Identity> {
        let token = bearer_token(headers).or_else(|| {
            CookieJar::from_headers(headers)
                .get(&self.cookie_name)
                .map(|cookie| cookie.value().to_string())
        })?;
        self.verify(&token)
    }

    /// The cookie handed out at login.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age_i64()))
            .build()
    }

    /// The cookie to pass to `CookieJar::remove` at logout.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone()).path("/").build()
    }

    fn max_age_i64(&self) -> i64 {
        i64::try_from(self.max_age_secs).unwrap_or(i64::MAX)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
