use async_trait::async_trait;

use tessera_core::AppResult;
use tessera_domain::{User, UserId};

/// Input payload for user registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterUserInput {
    /// Requested unique username.
    pub username: Option<String>,
    /// Display name; falls back to the username when absent.
    pub display_name: Option<String>,
    /// Optional email address.
    pub email: Option<String>,
}

/// Repository port for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user; fails with a conflict on duplicate usernames.
    async fn insert(&self, user: User) -> AppResult<User>;

    /// Returns a user by id.
    async fn get(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Returns a user by unique username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
}
