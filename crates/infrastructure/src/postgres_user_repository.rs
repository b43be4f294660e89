use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use tessera_application::UserRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{EmailAddress, User, UserId, Username};

const USERNAME_UNIQUE_CONSTRAINT: &str = "users_username_key";

/// PostgreSQL-backed repository for user records.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: String,
    email: Option<String>,
}

fn user_from_row(row: UserRow) -> AppResult<User> {
    let email = row.email.map(EmailAddress::new).transpose()?;
    User::new(
        UserId::from_uuid(row.id),
        Username::new(row.username)?,
        row.display_name,
        email,
    )
}

fn map_user_insert_error(error: sqlx::Error, username: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.constraint() == Some(USERNAME_UNIQUE_CONSTRAINT) {
            return AppError::Conflict(format!("username '{username}' is already taken"));
        }
    }

    AppError::Internal(format!("failed to persist user: {error}"))
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: User) -> AppResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, email)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.username().as_str())
        .bind(user.display_name().as_str())
        .bind(user.email().map(EmailAddress::as_str))
        .execute(&self.pool)
        .await
        .map_err(|error| map_user_insert_error(error, user.username().as_str()))?;

        Ok(user)
    }

    async fn get(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, display_name, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user: {error}")))?;

        row.map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, display_name, email
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        row.map(user_from_row).transpose()
    }
}
