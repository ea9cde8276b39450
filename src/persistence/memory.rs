use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AuthStore;
use crate::error::DatabaseError;
use crate::models::{RefreshToken, User};

/// Process-local store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct InMemoryAuthStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DatabaseError> {
        self.inner
            .lock()
            .map_err(|_| DatabaseError::UnexpectedError("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AuthStore for InMemoryAuthStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables()?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables()?;
        Ok(tables.users.get(&id).cloned())
    }

    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, DatabaseError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueConstraintViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn create_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, DatabaseError> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::QueryExecution(
                "refresh_tokens_user_id_fkey violated".to_string(),
            ));
        }
        if tables.refresh_tokens.contains_key(token_hash) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "refresh_tokens_pkey".to_string(),
            ));
        }

        let now = Utc::now();
        let token = RefreshToken {
            token_hash: token_hash.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };
        tables.refresh_tokens.insert(token.token_hash.clone(), token.clone());

        Ok(token)
    }

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        let tables = self.tables()?;
        Ok(tables.refresh_tokens.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables()?;
        if let Some(token) = tables.refresh_tokens.get_mut(token_hash) {
            if token.revoked_at.is_none() {
                token.revoked_at = Some(revoked_at);
                token.updated_at = revoked_at;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = InMemoryAuthStore::new();
        store.create_user("a@x.com", "digest").await.expect("Failed to create user");

        let result = store.create_user("a@x.com", "digest").await;

        assert!(matches!(result, Err(DatabaseError::UniqueConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = InMemoryAuthStore::new();
        store.create_user("a@x.com", "digest").await.expect("Failed to create user");

        let found = store.find_user_by_email("A@X.COM").await.expect("Lookup failed");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_revocation_time() {
        let store = InMemoryAuthStore::new();
        let user = store.create_user("a@x.com", "digest").await.expect("Failed to create user");
        let expires_at = Utc::now() + Duration::days(60);
        store
            .create_refresh_token("hash", user.id, expires_at)
            .await
            .expect("Failed to create token");

        let first = Utc::now();
        store.revoke_refresh_token("hash", first).await.expect("Revoke failed");
        store
            .revoke_refresh_token("hash", first + Duration::hours(1))
            .await
            .expect("Revoke failed");

        let token = store
            .find_refresh_token("hash")
            .await
            .expect("Lookup failed")
            .expect("Token missing");
        assert_eq!(token.revoked_at, Some(first));
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_is_ok() {
        let store = InMemoryAuthStore::new();

        assert!(store.revoke_refresh_token("missing", Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_token_requires_existing_user() {
        let store = InMemoryAuthStore::new();

        let result = store
            .create_refresh_token("hash", Uuid::new_v4(), Utc::now())
            .await;

        assert!(result.is_err());
    }
}
