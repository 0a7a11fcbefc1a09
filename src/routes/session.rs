/// Session Routes
///
/// Expose the identity resolved by `SessionMiddleware`.

use actix_web::{web, HttpResponse};

use crate::auth::Identity;
use crate::error::AppError;
use crate::users::UserStore;

/// GET /auth/session
///
/// The current identity, or `null` for anonymous requests. Never fails on
/// a missing or invalid token.
pub async fn current_session(identity: Option<Identity>) -> HttpResponse {
    HttpResponse::Ok().json(identity)
}

/// GET /api/me
///
/// The authenticated caller. A handle missing from the token is filled in
/// from the user record when one exists.
///
/// # Errors
/// - 401: No verified session on the request
/// - 500: Internal server error
pub async fn current_user(
    identity: Identity,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let mut identity = identity;

    if identity.handle.is_none() {
        if let Some(user) = store.find_by_id(&identity.user_id)? {
            identity.handle = user.handle;
        }
    }

    Ok(HttpResponse::Ok().json(identity))
}
