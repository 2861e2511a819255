use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::cancellable;
use crate::{
    db::{Stores, UserStore},
    error::{AppError, AppResult},
    models::User,
};

/// Account provisioning and lookup
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    dimension: usize,
}

impl UserService {
    pub fn new(stores: &Stores, dimension: usize) -> Self {
        Self {
            users: stores.users.clone(),
            dimension,
        }
    }

    /// Returns the account for `email`, creating a `USER` with a zero taste
    /// vector on first sign-in
    #[tracing::instrument(skip(self, token))]
    pub async fn sign_in(
        &self,
        email: &str,
        name: &str,
        token: &CancellationToken,
    ) -> AppResult<User> {
        let candidate = User::new(email, name, self.dimension)?;

        if let Some(existing) = cancellable(token, self.users.get_by_email(&candidate.email)).await? {
            return Ok(existing);
        }

        match cancellable(token, self.users.create(&candidate)).await {
            Ok(()) => {
                tracing::info!(user_id = %candidate.id, "User provisioned");
                Ok(candidate)
            }
            // A concurrent sign-in may have created the account first.
            Err(err @ (AppError::Database(_) | AppError::Persistence(_))) => {
                cancellable(token, self.users.get_by_email(&candidate.email))
                    .await?
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_by_email(&self, email: &str, token: &CancellationToken) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        cancellable(token, self.users.get_by_email(&email))
            .await?
            .ok_or(AppError::UserNotFound(email))
    }

    pub async fn get_by_id(&self, id: Uuid, token: &CancellationToken) -> AppResult<User> {
        cancellable(token, self.users.get_by_id(id))
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{Role, ValidationError};

    fn service() -> UserService {
        UserService::new(&Stores::in_memory(InMemoryStore::new()), 4)
    }

    #[tokio::test]
    async fn test_sign_in_provisions_once() {
        let service = service();
        let token = CancellationToken::new();

        let first = service.sign_in("Ada@Example.com", "Ada", &token).await.unwrap();
        assert_eq!(first.email, "ada@example.com");
        assert_eq!(first.role, Role::User);
        assert_eq!(first.taste.dimension(), 4);
        assert!(first.taste.is_zero());

        let second = service.sign_in("ada@example.com ", "Ada L.", &token).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Ada");
    }

    #[tokio::test]
    async fn test_sign_in_requires_email() {
        let result = service().sign_in("  ", "Nobody", &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::EmptyField("email")))
        ));
    }

    #[tokio::test]
    async fn test_lookup_unknown_user() {
        let service = service();
        let token = CancellationToken::new();

        let result = service.get_by_email("who@example.com", &token).await;
        assert!(matches!(result, Err(AppError::UserNotFound(email)) if email == "who@example.com"));

        let user = service.sign_in("who@example.com", "Who", &token).await.unwrap();
        assert_eq!(service.get_by_id(user.id, &token).await.unwrap(), user);
    }
}
