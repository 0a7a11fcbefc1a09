/// Identity extraction for handlers
///
/// A handler taking `Identity` only runs for authenticated requests; the
/// rest are answered with 401 before the handler is called.

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Identity;
use crate::error::{AppError, AuthError};

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .ok_or(AppError::Auth(AuthError::MissingIdentity)),
        )
    }
}
