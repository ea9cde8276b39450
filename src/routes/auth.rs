/// Authentication Routes
///
/// Login, access token refresh and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::error::{AppError, AuthError};
use crate::middleware::bearer_token;
use crate::models::{Credentials, PublicUser};
use crate::service::AuthenticationService;

/// Login response: the public user plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

fn refresh_token_from(req: &HttpRequest) -> Result<String, AppError> {
    bearer_token(req.headers())
        .map(str::to_string)
        .ok_or(AppError::Auth(AuthError::MissingToken))
}

/// POST /api/login
///
/// # Errors
/// - 401: Invalid credentials (email not found or wrong password, same body)
/// - 500: Internal server error
pub async fn login(
    form: web::Json<Credentials>,
    service: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let session = service.login(form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: session.user,
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Expects `Authorization: Bearer <refresh token>`. Returns a new access
/// token; the refresh token stays valid.
///
/// # Errors
/// - 401: Missing, unknown, revoked or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    service: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = refresh_token_from(&req)?;
    let token = service.refresh(&refresh_token).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse { token }))
}

/// POST /api/revoke
///
/// Expects `Authorization: Bearer <refresh token>`. Idempotent.
pub async fn revoke(
    req: HttpRequest,
    service: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = refresh_token_from(&req)?;
    service.logout(&refresh_token).await?;

    Ok(HttpResponse::NoContent().finish())
}
