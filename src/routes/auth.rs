/// Credential Routes
///
/// Registration and password login. Sessions themselves are issued by the
/// identity provider; these routes only create and check credentials.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{decoy_record, hash_password, needs_rehash, verify_password, HashOptions};
use crate::error::{AppError, AuthError, ErrorContext, PasswordError, ValidationError};
use crate::users::{UserRecord, UserStore};

/// Upper bound on plaintext size, to keep KDF input bounded
const MAX_PASSWORD_BYTES: usize = 1024;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub handle: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    pub created_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            handle: user.handle.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Successful login
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    /// Whether the stored hash was upgraded to the current parameters
    pub rehashed: bool,
}

/// Record checked when a login has no real hash to check against
#[derive(Debug, Clone)]
pub struct DecoyCredential(String);

impl DecoyCredential {
    /// # Errors
    /// Returns error if the options are unusable
    pub fn new(options: &HashOptions) -> Result<Self, PasswordError> {
        decoy_record(options).map(Self)
    }
}

/// The record a login is checked against, and whether it belongs to the
/// account. Missing accounts and accounts without a password get the decoy.
fn login_record<'a>(user: Option<&'a UserRecord>, decoy: &'a DecoyCredential) -> (&'a str, bool) {
    match user.and_then(|user| user.password_hash.as_deref()) {
        Some(stored) => (stored, true),
        None => (decoy.0.as_str(), false),
    }
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(trimmed.to_string())
        }
        _ => Err(ValidationError::InvalidFormat("email".to_string())),
    }
}

/// Run the KDF off the async workers
async fn hash_blocking(password: String, options: HashOptions) -> Result<String, AppError> {
    Ok(web::block(move || hash_password(&password, &options)).await??)
}

/// POST /auth/register
///
/// Create an account with an email and password.
///
/// # Errors
/// - 400: Validation errors (empty or oversized password, bad email)
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn UserStore>,
    options: web::Data<HashOptions>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");
    let form = form.into_inner();

    let email = validate_email(&form.email)?;
    validate_password(&form.password)?;
    let handle = form
        .handle
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());

    let password_hash = hash_blocking(form.password, **options).await?;

    let user = UserRecord::new(&email, handle, Some(password_hash));
    let response = UserResponse::from(&user);
    if let Err(e) = store.insert(user) {
        context.log_error(&e);
        return Err(e);
    }

    tracing::info!(
        request_id = %context.request_id,
        user_id = %response.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(response))
}

/// POST /auth/login
///
/// Check an email and password. When the stored hash was made with older
/// parameters it is replaced with one made with the current ones.
///
/// # Errors
/// - 400: Validation errors
/// - 401: Unknown user, wrong password, or a credential that needs migration
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn UserStore>,
    options: web::Data<HashOptions>,
    decoy: web::Data<DecoyCredential>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let form = form.into_inner();

    let email = validate_email(&form.email)?;
    validate_password(&form.password)?;

    let user = store.find_by_email(&email)?;
    let (stored, genuine) = login_record(user.as_ref(), &decoy);
    let stored = stored.to_string();

    let password = form.password;
    let verify_stored = stored.clone();
    let outcome = web::block(move || {
        verify_password(&password, &verify_stored).map(|matched| (matched, password))
    })
    .await?;

    let user = match user {
        Some(user) if genuine => user,
        Some(user) => {
            tracing::warn!(
                request_id = %context.request_id,
                user_id = %user.id,
                "Password login attempted for account without a password"
            );
            return Err(AuthError::InvalidCredentials.into());
        }
        None => return Err(AuthError::InvalidCredentials.into()),
    };
    let context = context.with_user_id(user.id.clone());

    let password = match outcome {
        Ok((true, password)) => password,
        Ok((false, _)) => return Err(AuthError::InvalidCredentials.into()),
        Err(PasswordError::LegacyHash) => {
            let err = AppError::Auth(AuthError::CredentialMigrationRequired);
            context.log_error(&err);
            return Err(err);
        }
        Err(e) => return Err(e.into()),
    };

    let mut rehashed = false;
    if needs_rehash(&stored, &options) {
        let upgraded = hash_blocking(password, **options).await?;
        rehashed = store.update_password_hash(&user.id, upgraded)?;
        tracing::info!(
            request_id = %context.request_id,
            user_id = %user.id,
            "Password hash upgraded to current parameters"
        );
    }

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&user),
        rehashed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_validation() {
        assert!(validate_password("x").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"a".repeat(MAX_PASSWORD_BYTES)).is_ok());
        assert!(validate_password(&"a".repeat(MAX_PASSWORD_BYTES + 1)).is_err());
    }

    #[test]
    fn test_login_record_falls_back_to_decoy() {
        let decoy = DecoyCredential("scrypt:1:1024:8:1:64:c2FsdA==:aGFzaA==".to_string());
        let with_password = UserRecord::new("ada@example.com", None, Some("stored".to_string()));
        let without_password = UserRecord::new("bob@example.com", None, None);

        assert_eq!(login_record(Some(&with_password), &decoy), ("stored", true));
        assert_eq!(login_record(Some(&without_password), &decoy), (decoy.0.as_str(), false));
        assert_eq!(login_record(None, &decoy), (decoy.0.as_str(), false));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(validate_email("  ada@example.com ").unwrap(), "ada@example.com");
        for invalid in ["", "   ", "ada", "@example.com", "ada@", "ada@@example.com"] {
            assert!(validate_email(invalid).is_err(), "email {:?}", invalid);
        }
    }
}
