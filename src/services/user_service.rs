use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{self, AuthError};
use crate::database::models::User;
use crate::database::{DatabaseError, UserStore};

const NAME_MAX: usize = 100;

/// User accounts and token issuance
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(&self, name: &str, password: &str) -> Result<User, AuthError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > NAME_MAX {
            return Err(AuthError::Validation(format!(
                "name must be between 1 and {} characters",
                NAME_MAX
            )));
        }
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let hash = auth::hash_password(password)?;
        let user = self.store.insert(name, &hash).await.map_err(|e| match e {
            DatabaseError::UniqueViolation(_) => AuthError::UserExists(name.to_string()),
            other => AuthError::Database(other),
        })?;

        info!("Created user {}", user.name);
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list().await?)
    }

    /// Verify credentials and sign a token. Unknown user and wrong password look the same.
    pub async fn login(&self, name: &str, password: &str) -> Result<String, AuthError> {
        let name = name.trim();
        let user = self.store.find_by_name(name).await?;
        match user {
            Some(user) if auth::verify_password(password, &user.password_hash) => {
                auth::generate_jwt(&user.name)
            }
            _ => {
                warn!("Failed login for {}", name);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Resolve a bearer token to the stored user it was issued for.
    pub async fn resolve_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = auth::validate_jwt(token)?;
        self.store
            .find_by_name(&claims.sub)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("unknown subject".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn login_issues_a_token_that_resolves_back() {
        let users = service();
        users.create_user("admin", "pw").await.unwrap();

        let token = users.login("admin", "pw").await.unwrap();
        let user = users.resolve_token(&token).await.unwrap();
        assert_eq!(user.name, "admin");
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let users = service();
        users.create_user("admin", "pw").await.unwrap();

        assert!(matches!(users.login("admin", "nope").await, Err(AuthError::InvalidCredentials)));
        assert!(matches!(users.login("ghost", "pw").await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let users = service();
        users.create_user("admin", "pw").await.unwrap();
        assert!(matches!(
            users.create_user(" admin ", "pw2").await,
            Err(AuthError::UserExists(_))
        ));
    }

    #[tokio::test]
    async fn login_trims_the_name_like_registration() {
        let users = service();
        let user = users.create_user("  maria  ", "pw").await.unwrap();
        assert_eq!(user.name, "maria");

        assert!(users.login("  maria  ", "pw").await.is_ok());
        assert!(users.login("maria", "pw").await.is_ok());
    }
}
