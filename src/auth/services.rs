use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    auth::{
        dto::PublicUser,
        password::{hash_password_blocking, verify_password_blocking},
        repo::UserStore,
    },
    error::ApiError,
};

/// Registration and credential checks on top of a [`UserStore`].
#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserStore>,
    cost: u32,
}

impl CredentialService {
    pub fn new(users: Arc<dyn UserStore>, cost: u32) -> Self {
        Self { users, cost }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<PublicUser, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::missing_credentials());
        }

        // Fast path only; the insert below is what enforces uniqueness.
        if self.users.find_by_username(username).await?.is_some() {
            warn!(username, "username already exists");
            return Err(ApiError::username_taken());
        }

        let hash = hash_password_blocking(password, self.cost).await?;

        match self.users.create(username, &hash).await? {
            Some(user) => {
                info!(user_id = user.id, username = %user.username, "user registered");
                Ok(user.into())
            }
            None => {
                warn!(username, "username taken by concurrent registration");
                Err(ApiError::username_taken())
            }
        }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<PublicUser, ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::missing_credentials());
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            warn!(username, "login unknown username");
            return Err(ApiError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &user.password_hash).await? {
            warn!(username, user_id = user.id, "login invalid password");
            return Err(ApiError::InvalidCredentials);
        }

        info!(user_id = user.id, username = %user.username, "user logged in");
        Ok(user.into())
    }

    pub async fn list(&self) -> Result<Vec<PublicUser>, ApiError> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryUserStore;

    fn service() -> (CredentialService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::default());
        (CredentialService::new(store.clone(), 4), store)
    }

    #[tokio::test]
    async fn register_then_verify() {
        let (svc, _) = service();
        let user = svc.register("alice", "secret123").await.unwrap();
        assert_eq!(user.username, "alice");

        let verified = svc.verify("alice", "secret123").await.unwrap();
        assert_eq!(verified, user);
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let (svc, store) = service();
        svc.register("alice", "secret123").await.unwrap();
        let stored = store.find_by_username("alice").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret123");
        assert!(!stored.password_hash.contains("secret123"));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_without_second_row() {
        let (svc, store) = service();
        svc.register("alice", "secret123").await.unwrap();
        let err = svc.register("alice", "another1").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Username already exists");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_yield_one_user() {
        let (svc, store) = service();
        let (a, b) = tokio::join!(svc.register("bob", "pw-one"), svc.register("bob", "pw-two"));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let (svc, _) = service();
        svc.register("alice", "secret123").await.unwrap();

        let wrong_pw = svc.verify("alice", "wrong").await.unwrap_err();
        let unknown = svc.verify("mallory", "secret123").await.unwrap_err();
        assert!(matches!(wrong_pw, ApiError::InvalidCredentials));
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn empty_fields_are_validation_errors() {
        let (svc, _) = service();
        assert!(matches!(svc.register("", "pw").await, Err(ApiError::Validation(_))));
        assert!(matches!(svc.register("alice", "").await, Err(ApiError::Validation(_))));
        assert!(matches!(svc.verify("", "").await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn list_returns_public_users() {
        let (svc, _) = service();
        svc.register("alice", "secret123").await.unwrap();
        svc.register("bob", "hunter22").await.unwrap();
        let users = svc.list().await.unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob"]);
    }
}
