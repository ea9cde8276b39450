/// JWT Claims structure
///
/// Payload of an access token: registered claims only (RFC 7519).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Token ID, unique per issuance
    pub jti: String,
}

impl Claims {
    /// Create claims for `user_id` valid for `ttl` from `issued_at`
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration, issuer: &str) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `TokenError::Malformed` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// A token is expired from the second of `exp` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
