/// Access Token Codec
///
/// Signs and verifies HS256 JWTs binding a user ID. Verification is
/// stateless: no database lookup, only the signing key, the issuer tag and
/// the clock.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::clock::Clock;
use crate::error::{AppError, ConfigError, TokenError};

/// Immutable after construction; clones share the clock.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    /// # Errors
    /// Returns `ConfigError::MissingRequired` if the secret is empty
    pub fn new(secret: &str, issuer: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if issuer.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            clock,
        })
    }

    /// Sign an access token for `user_id`, valid for `ttl` from now
    ///
    /// # Errors
    /// Returns `AppError::Internal` if encoding fails
    pub fn sign(&self, user_id: Uuid, ttl: Duration) -> Result<String, AppError> {
        let claims = Claims::new(user_id, self.clock.now(), ttl, &self.issuer);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify an access token and return its subject
    ///
    /// # Errors
    /// - `TokenError::Malformed` if the token cannot be parsed
    /// - `TokenError::InvalidSignature` if it was not signed with this key
    /// - `TokenError::WrongIssuer` if the issuer claim differs
    /// - `TokenError::Expired` once the clock reaches `exp`
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.decode_claims(token)?;

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        claims.user_id()
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
        // Expiry is checked against the injected clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    tracing::debug!(error = %e, "Access token could not be parsed");
                    TokenError::Malformed
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::MockClock;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn codec_with(secret: &str, issuer: &str, clock: &MockClock) -> AccessTokenCodec {
        AccessTokenCodec::new(secret, issuer, Arc::new(clock.clone())).expect("Failed to build codec")
    }

    #[test]
    fn test_sign_and_verify_token() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let user_id = Uuid::new_v4();

        let token = codec.sign(user_id, Duration::hours(2)).expect("Failed to sign token");

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token), Ok(user_id));
    }

    #[test]
    fn test_token_expires_at_ttl() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let user_id = Uuid::new_v4();
        let token = codec.sign(user_id, Duration::hours(2)).expect("Failed to sign token");

        clock.advance(Duration::hours(2) - Duration::seconds(1));
        assert_eq!(codec.verify(&token), Ok(user_id));

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let other = codec_with("a-completely-different-secret-value", "test", &clock);

        let token = codec.sign(Uuid::new_v4(), Duration::hours(2)).expect("Failed to sign token");

        assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_payload() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let token = codec.sign(Uuid::new_v4(), Duration::hours(2)).expect("Failed to sign token");
        let forged = codec.sign(Uuid::new_v4(), Duration::hours(2)).expect("Failed to sign token");

        // Payload of one token, signature of another
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert_eq!(codec.verify(&spliced), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_wrong_issuer() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let other = codec_with(SECRET, "wrong-issuer", &clock);

        let token = codec.sign(Uuid::new_v4(), Duration::hours(2)).expect("Failed to sign token");

        assert_eq!(other.verify(&token), Err(TokenError::WrongIssuer));
    }

    #[test]
    fn test_malformed_token() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);

        assert_eq!(codec.verify("invalid.token.here"), Err(TokenError::Malformed));
        assert_eq!(codec.verify("not-a-jwt"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_tokens_for_same_user_differ() {
        let clock = MockClock::default();
        let codec = codec_with(SECRET, "test", &clock);
        let user_id = Uuid::new_v4();

        let first = codec.sign(user_id, Duration::hours(2)).expect("Failed to sign token");
        let second = codec.sign(user_id, Duration::hours(2)).expect("Failed to sign token");

        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let result = AccessTokenCodec::new("", "test", Arc::new(MockClock::default()));

        assert!(matches!(result, Err(ConfigError::MissingRequired(_))));
    }
}
