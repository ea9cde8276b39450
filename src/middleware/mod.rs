/// Middleware module
///
/// Custom middleware for authentication.

mod jwt_middleware;

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

pub use jwt_middleware::{AuthenticatedUser, JwtMiddleware};

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
