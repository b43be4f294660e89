use std::sync::Arc;

use tessera_core::{AppError, AppResult, required_field};
use tessera_domain::{EmailAddress, RegistrationMode, User, UserId, Username};

use crate::user_ports::{RegisterUserInput, UserRepository};

/// Application service for the user directory.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    registration_mode: RegistrationMode,
}

impl UserService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, registration_mode: RegistrationMode) -> Self {
        Self {
            users,
            registration_mode,
        }
    }

    /// Registers a new user, honoring the configured registration mode.
    pub async fn register(&self, input: RegisterUserInput) -> AppResult<User> {
        if self.registration_mode == RegistrationMode::InviteOnly {
            return Err(AppError::Unauthorized(
                "registration is invite-only".to_owned(),
            ));
        }

        let username = Username::new(required_field(input.username.as_deref(), "username")?)?;
        let display_name = input
            .display_name
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| username.as_str().to_owned());
        let email = input.email.map(EmailAddress::new).transpose()?;

        if self
            .users
            .find_by_username(username.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let user = User::new(UserId::new(), username, display_name, email)?;
        self.users.insert(user).await
    }

    /// Returns a user by unique username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.users.find_by_username(username).await
    }

    /// Returns a user by id.
    pub async fn get(&self, user_id: UserId) -> AppResult<Option<User>> {
        self.users.get(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use tessera_core::{AppError, AppResult};
    use tessera_domain::{RegistrationMode, User, UserId};

    use crate::user_ports::{RegisterUserInput, UserRepository};

    use super::UserService;

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn insert(&self, user: User) -> AppResult<User> {
            self.users.lock().await.push(user.clone());
            Ok(user)
        }

        async fn get(&self, user_id: UserId) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id() == user_id)
                .cloned())
        }

        async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.username().as_str() == username)
                .cloned())
        }
    }

    fn open_service() -> UserService {
        UserService::new(
            Arc::new(FakeUserRepository::default()),
            RegistrationMode::Open,
        )
    }

    #[tokio::test]
    async fn register_creates_user_with_fallback_display_name() -> AppResult<()> {
        let service = open_service();

        let user = service
            .register(RegisterUserInput {
                username: Some("alice".to_owned()),
                ..RegisterUserInput::default()
            })
            .await?;

        assert_eq!(user.display_name().as_str(), "alice");
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() -> AppResult<()> {
        let service = open_service();

        let input = RegisterUserInput {
            username: Some("alice".to_owned()),
            ..RegisterUserInput::default()
        };
        service.register(input.clone()).await?;
        let second = service.register(input).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn invite_only_mode_blocks_registration() {
        let service = UserService::new(
            Arc::new(FakeUserRepository::default()),
            RegistrationMode::InviteOnly,
        );

        let result = service
            .register(RegisterUserInput {
                username: Some("alice".to_owned()),
                ..RegisterUserInput::default()
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn missing_username_is_rejected() {
        let service = open_service();

        let result = service.register(RegisterUserInput::default()).await;
        assert!(matches!(result, Err(AppError::MissingField(_))));
    }
}
