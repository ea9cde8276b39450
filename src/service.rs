/// Authentication Service
///
/// Signup, login, token refresh and logout on top of the password hasher,
/// the access token codec, the refresh token issuer and an `AuthStore`.
///
/// # Security Notes
/// - Unknown email and wrong password produce the same error, and both
///   paths pay for one bcrypt verification
/// - Refresh token failures stay distinguishable (not found, revoked, expired)
/// - Nothing secret is logged: only user IDs

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::auth::{AccessTokenCodec, Clock, PasswordHasher, RefreshTokenIssuer};
use crate::error::{AppError, AuthError, DatabaseError, PasswordError, ValidationError};
use crate::models::{Credentials, LoginSession, PublicUser};
use crate::persistence::AuthStore;

/// RFC 5321 limit
const MAX_EMAIL_LENGTH: usize = 254;

pub fn access_token_ttl() -> Duration {
    Duration::hours(2)
}

pub fn refresh_token_ttl() -> Duration {
    Duration::days(60)
}

pub struct AuthenticationService {
    store: Arc<dyn AuthStore>,
    hasher: PasswordHasher,
    access_tokens: AccessTokenCodec,
    refresh_tokens: RefreshTokenIssuer,
    // Verified against when the email is unknown, to keep login timing uniform.
    dummy_digest: String,
}

impl AuthenticationService {
    /// # Errors
    /// Fails if the hasher cannot produce a digest with its configured cost
    pub fn new(
        store: Arc<dyn AuthStore>,
        hasher: PasswordHasher,
        access_tokens: AccessTokenCodec,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let dummy_digest = hasher.hash(&Uuid::new_v4().to_string())?;
        let refresh_tokens = RefreshTokenIssuer::new(store.clone(), clock);

        Ok(Self {
            store,
            hasher,
            access_tokens,
            refresh_tokens,
            dummy_digest,
        })
    }

    pub fn access_tokens(&self) -> &AccessTokenCodec {
        &self.access_tokens
    }

    // bcrypt is CPU-bound; keep it off the request worker.
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher;
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;

        Ok(digest)
    }

    async fn verify_password(&self, digest: String, password: String) -> Result<(), AppError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&digest, &password))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))??;

        Ok(())
    }

    /// Create an account
    ///
    /// # Errors
    /// - `ValidationError` for an empty email/password or an overlong email
    /// - `AuthError::DuplicateAccount` if the email is already registered
    /// - `PasswordError::Hashing` if the password cannot be hashed
    pub async fn signup(&self, credentials: Credentials) -> Result<PublicUser, AppError> {
        let Credentials { email, password } = credentials;

        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email".to_string()).into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyField("password".to_string()).into());
        }
        if email.chars().count() > MAX_EMAIL_LENGTH {
            return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH).into());
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            tracing::warn!("Signup rejected: account already exists");
            return Err(AuthError::DuplicateAccount.into());
        }

        let hashed_password = self.hash_password(password).await?;

        // The store's unique constraint is authoritative if another signup won the race.
        let user = self
            .store
            .create_user(&email, &hashed_password)
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueConstraintViolation(_) => AppError::Auth(AuthError::DuplicateAccount),
                other => AppError::Database(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered successfully");

        Ok(user.into())
    }

    /// Verify credentials and open a session
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` for an unknown email or wrong password
    /// - storage or token errors; no session is returned in that case
    pub async fn login(&self, credentials: Credentials) -> Result<LoginSession, AppError> {
        let Credentials { email, password } = credentials;

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                let _ = self.verify_password(self.dummy_digest.clone(), password).await;
                tracing::warn!("Login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        match self.verify_password(user.hashed_password.clone(), password).await {
            Ok(()) => {}
            Err(AppError::Password(PasswordError::Mismatch)) => {
                tracing::warn!("Login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        }

        let access_token = self.access_tokens.sign(user.id, access_token_ttl())?;
        let refresh_token = self.refresh_tokens.generate()?;
        self.refresh_tokens
            .persist(&refresh_token, user.id, refresh_token_ttl())
            .await?;

        tracing::info!(user_id = %user.id, "User logged in successfully");

        Ok(LoginSession {
            user: user.into(),
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a refresh token
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let user_id = self.refresh_tokens.redeem(refresh_token).await?;
        let access_token = self.access_tokens.sign(user_id, access_token_ttl())?;

        tracing::info!(user_id = %user_id, "Access token refreshed");

        Ok(access_token)
    }

    /// Revoke a refresh token. Calling it twice is fine.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        self.refresh_tokens.revoke(refresh_token).await?;
        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Verify an access token and return the user it was issued to
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AppError> {
        Ok(self.access_tokens.verify(access_token)?)
    }

    /// Public profile of an authenticated user
    pub async fn current_user(&self, user_id: Uuid) -> Result<PublicUser, AppError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("user".to_string()))?;

        Ok(user.into())
    }
}
