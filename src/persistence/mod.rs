/// Persistence service
///
/// The authentication core talks to storage only through `AuthStore`.
/// Uniqueness of emails and refresh-token keys, and atomicity of each call,
/// are the store's responsibility.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{RefreshToken, User};

pub use memory::InMemoryAuthStore;
pub use postgres::PgAuthStore;

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Fails with `DatabaseError::UniqueConstraintViolation` if the email is taken.
    async fn create_user(&self, email: &str, hashed_password: &str) -> Result<User, DatabaseError>;

    async fn create_refresh_token(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, DatabaseError>;

    async fn find_refresh_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError>;

    /// Marks the token revoked unless it already is. Unknown keys are not an error.
    async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
}
