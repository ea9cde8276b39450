/// Refresh Token Management
///
/// Handles secure refresh token generation, storage, validation, and revocation.
/// Refresh tokens are:
/// - 256 bits from the OS random source, hex encoded (no decodable structure)
/// - Hashed with SHA-256 before storage (never store plaintext)
/// - Reusable until they expire or are revoked (no rotation on redeem)
/// - Revoked softly: the record stays, with `revoked_at` set

use std::sync::Arc;

use chrono::Duration;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::clock::Clock;
use crate::error::{AppError, TokenError};
use crate::models::{RefreshToken, RefreshTokenState};
use crate::persistence::AuthStore;

const TOKEN_BYTES: usize = 32;

/// Generate a new cryptographically secure refresh token
///
/// # Errors
/// Returns `TokenError::EntropySource` if the OS random source fails
pub fn generate_refresh_token() -> Result<String, TokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        tracing::error!(error = %e, "OS random source unavailable");
        TokenError::EntropySource
    })?;

    Ok(hex::encode(bytes))
}

/// Hash a refresh token using SHA-256
///
/// Storage only ever sees this digest.
pub(crate) fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues refresh tokens and tracks their stored lifecycle.
#[derive(Clone)]
pub struct RefreshTokenIssuer {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenIssuer {
    pub fn new(store: Arc<dyn AuthStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn generate(&self) -> Result<String, TokenError> {
        generate_refresh_token()
    }

    /// Save a refresh token for `user_id`, expiring `ttl` from now
    ///
    /// # Errors
    /// Any storage failure, including a key collision, is returned as a
    /// database error
    pub async fn persist(
        &self,
        token: &str,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<RefreshToken, AppError> {
        let expires_at = self.clock.now() + ttl;
        let record = self
            .store
            .create_refresh_token(&hash_token(token), user_id, expires_at)
            .await?;

        Ok(record)
    }

    /// Validate a refresh token and return its owner
    ///
    /// Checks, in order:
    /// 1. Token exists
    /// 2. Token has not been revoked
    /// 3. Token has not expired
    ///
    /// The token is left untouched on success.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, AppError> {
        let record = self
            .store
            .find_refresh_token(&hash_token(token))
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token not found");
                TokenError::NotFound
            })?;

        match record.state_at(self.clock.now()) {
            RefreshTokenState::Active => Ok(record.user_id),
            RefreshTokenState::Revoked { at } => {
                tracing::warn!(user_id = %record.user_id, revoked_at = %at, "Attempt to use revoked refresh token");
                Err(TokenError::Revoked.into())
            }
            RefreshTokenState::Expired { at } => {
                tracing::info!(user_id = %record.user_id, expired_at = %at, "Refresh token expired");
                Err(TokenError::Expired.into())
            }
        }
    }

    /// Revoke a refresh token
    ///
    /// Idempotent: already-revoked and unknown tokens are not errors.
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.store
            .revoke_refresh_token(&hash_token(token), self.clock.now())
            .await?;

        Ok(())
    }
}
