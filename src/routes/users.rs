/// User Routes
///
/// Account creation and the authenticated user's own profile.

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::models::{Credentials, PublicUser};
use crate::service::AuthenticationService;

#[derive(Serialize)]
pub struct UserEnvelope {
    pub user: PublicUser,
}

/// POST /api/users
///
/// # Errors
/// - 400: Empty email/password, or a password that cannot be hashed
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn create_user(
    form: web::Json<Credentials>,
    service: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let user = service.signup(form.into_inner()).await?;

    Ok(HttpResponse::Created().json(UserEnvelope { user }))
}

/// GET /api/users/me
///
/// **Requires valid access token** in the Authorization header
/// (checked by `JwtMiddleware`).
pub async fn get_current_user(
    identity: web::ReqData<AuthenticatedUser>,
    service: web::Data<AuthenticationService>,
) -> Result<HttpResponse, AppError> {
    let user = service.current_user(identity.user_id).await?;

    Ok(HttpResponse::Ok().json(user))
}
