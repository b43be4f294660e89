use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tessera_application::UserRepository;
use tessera_core::{AppError, AppResult};
use tessera_domain::{User, UserId};

/// In-memory implementation of the user repository port.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|stored| stored.username() == user.username())
        {
            return Err(AppError::Conflict(format!(
                "username '{}' is already taken",
                user.username()
            )));
        }

        users.insert(user.id(), user.clone());
        Ok(user)
    }

    async fn get(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.username().as_str() == username)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use tessera_application::UserRepository;
    use tessera_core::{AppError, AppResult};
    use tessera_domain::{User, UserId, Username};

    use super::InMemoryUserRepository;

    #[tokio::test]
    async fn duplicate_username_conflicts() -> AppResult<()> {
        let repository = InMemoryUserRepository::new();

        let first = User::new(UserId::new(), Username::new("alice")?, "Alice", None)?;
        let second = User::new(UserId::new(), Username::new("alice")?, "Alice B", None)?;

        repository.insert(first).await?;
        let result = repository.insert(second).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        Ok(())
    }
}
