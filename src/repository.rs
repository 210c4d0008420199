use crate::models::{NewUser, Role, User};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// RepositoryError
///
/// Failures a caller can act on. Lookups that simply find nothing return `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository Trait
///
/// Persistence contract for user records. Handlers and the full identity resolver
/// talk to this trait only; the edge gate never touches it.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>`
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    // `Ok(None)` only when no such row exists; query failures are `Err`.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    // Email comparison is case-insensitive.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    // Fails with `EmailTaken` when the unique email constraint is hit.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn update_user_name(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<Option<User>, RepositoryError>;

    // --- Admin ---
    // Client-role users, newest first, optionally filtered on name/email.
    async fn list_clients(&self, search: Option<String>) -> Vec<User>;
    async fn count_clients(&self) -> i64;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, name, role, password_hash, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("get_user error: {:?}", e);
                RepositoryError::Database(e)
            })
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("get_user_by_email error: {:?}", e);
                RepositoryError::Database(e)
            })
    }

    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.role)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    RepositoryError::EmailTaken
                }
                other => RepositoryError::Database(other),
            })
    }

    async fn update_user_name(
        &self,
        id: Uuid,
        name: Option<String>,
    ) -> Result<Option<User>, RepositoryError> {
        let sql = format!("UPDATE users SET name = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("update_user_name error: {:?}", e);
                RepositoryError::Database(e)
            })
    }

    /// list_clients
    ///
    /// QueryBuilder keeps the optional search clause parameterized.
    async fn list_clients(&self, search: Option<String>) -> Vec<User> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = "
        ));
        builder.push_bind(Role::Client);

        if let Some(s) = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&s));
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(r" ESCAPE '\' OR email ILIKE ");
            builder.push_bind(pattern);
            builder.push(r" ESCAPE '\')");
        }

        builder.push(" ORDER BY created_at DESC");

        match builder.build_query_as::<User>().fetch_all(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("list_clients error: {:?}", e);
                vec![]
            }
        }
    }

    async fn count_clients(&self) -> i64 {
        match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(Role::Client)
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("count_clients error: {:?}", e);
                0
            }
        }
    }
}

/// Makes `%`, `_` and `\` match literally inside an `ILIKE ... ESCAPE '\'` pattern.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
