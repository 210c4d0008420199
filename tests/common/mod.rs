#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, header},
    response::Response,
};
use chrono::Utc;
use coaching_portal::{
    AppConfig, AppState,
    auth::{Claims, password::hash_password},
    models::{NewUser, Role, User},
    repository::{Repository, RepositoryError},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-value-1234567890";
pub const TEST_PASSWORD: &str = "correct-horse-1";

// --- In-memory Repository ---

#[derive(Default)]
pub struct MockRepo {
    users: Mutex<Vec<User>>,
}

impl MockRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts a user whose password is `TEST_PASSWORD`.
    pub fn seed(&self, email: &str, name: Option<&str>, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            role,
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn remove(&self, id: Uuid) {
        self.users.lock().unwrap().retain(|u| u.id != id);
    }

    pub fn set_role(&self, id: Uuid, role: Role) {
        for user in self.users.lock().unwrap().iter_mut() {
            if user.id == id {
                user.role = role;
            }
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.find_by_email(email))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(RepositoryError::EmailTaken);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            role: user.role,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user_name(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<Option<User>, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
            user.name = name;
            user.clone()
        }))
    }

    async fn list_clients(&self, search: Option<String>) -> Vec<User> {
        let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        let mut clients: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == Role::Client)
            .filter(|u| match &needle {
                Some(n) => {
                    u.email.to_lowercase().contains(n)
                        || u.name.as_deref().unwrap_or("").to_lowercase().contains(n)
                }
                None => true,
            })
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        clients
    }

    async fn count_clients(&self) -> i64 {
        self.users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.role == Role::Client)
            .count() as i64
    }
}

// --- Unreachable Database ---

/// Every query fails the way a lost Postgres connection does.
pub struct FailingRepo;

fn outage() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl Repository for FailingRepo {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, RepositoryError> {
        Err(outage())
    }

    async fn get_user_by_email(&self, _email: &str) -> Result<Option<User>, RepositoryError> {
        Err(outage())
    }

    async fn create_user(&self, _user: NewUser) -> Result<User, RepositoryError> {
        Err(outage())
    }

    async fn update_user_name(
        &self,
        _id: Uuid,
        _name: Option<String>,
    ) -> Result<Option<User>, RepositoryError> {
        Err(outage())
    }

    async fn list_clients(&self, _search: Option<String>) -> Vec<User> {
        vec![]
    }

    async fn count_clients(&self) -> i64 {
        0
    }
}

// --- State & Tokens ---

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.secret = TEST_SECRET.to_string();
    config
}

pub fn test_state(repo: Arc<MockRepo>) -> AppState {
    AppState::new(repo, test_config()).unwrap()
}

pub fn token_for(state: &AppState, user: &User) -> String {
    state.sessions.issue(user.id, user.role).unwrap()
}

/// A correctly signed token that expired an hour ago.
pub fn expired_token(subject: Uuid, role: Role) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject,
        role,
        iat: now - 7200,
        exp: now - 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

// --- Requests & Responses ---

pub fn session_cookie(token: &str) -> String {
    format!("session_token={token}")
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, session_cookie(token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json(method: Method, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, session_cookie(token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
}
