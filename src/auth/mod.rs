/// Authentication module
///
/// Password hashing, access token signing/verification, and refresh
/// token issuance/revocation.

mod claims;
mod clock;
mod jwt;
mod password;
mod refresh_token;

pub use claims::Claims;
pub use clock::{Clock, MockClock, SystemClock};
pub use jwt::AccessTokenCodec;
pub use password::{PasswordHasher, MAX_PASSWORD_BYTES};
pub use refresh_token::generate_refresh_token;
pub use refresh_token::RefreshTokenIssuer;
