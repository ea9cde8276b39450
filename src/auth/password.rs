/// Password Hashing and Verification
///
/// Adaptive bcrypt hashing with a tunable cost factor. Verification is
/// delegated to bcrypt's constant-time comparison.

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};

use crate::error::PasswordError;

/// bcrypt only consumes the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost factor
    ///
    /// The cost is not checked here; an out-of-range value fails every
    /// `hash` call with `PasswordError::Hashing`.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password using bcrypt
    ///
    /// # Errors
    /// Returns `PasswordError::Hashing` if:
    /// - the password is longer than 72 bytes
    /// - the cost factor is outside bcrypt's range
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::Hashing(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }

        hash(password, self.cost).map_err(|e| PasswordError::Hashing(describe(&e)))
    }

    /// Verify a password against a stored digest
    ///
    /// # Errors
    /// - `PasswordError::Mismatch` when the password is wrong
    /// - `PasswordError::CorruptDigest` when the digest cannot be parsed
    pub fn verify(&self, digest: &str, password: &str) -> Result<(), PasswordError> {
        // Nothing that long was ever accepted by `hash`.
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::Mismatch);
        }

        match verify(password, digest) {
            Ok(true) => Ok(()),
            Ok(false) => Err(PasswordError::Mismatch),
            Err(e) => {
                tracing::error!(error = %describe(&e), "Stored password digest could not be parsed");
                Err(PasswordError::CorruptDigest)
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

// Some bcrypt messages echo the digest they failed on, so only the kind
// of failure is kept.
fn describe(err: &BcryptError) -> String {
    match err {
        BcryptError::CostNotAllowed(cost) => format!("cost {} is not allowed", cost),
        _ => "bcrypt rejected the input".to_string(),
    }
}
