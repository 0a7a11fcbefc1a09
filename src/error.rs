/// Error Handling Module
///
/// This module provides the error types for the authentication core and the
/// HTTP layer around it. It covers:
/// 1. Domain-Specific Error Types (password records, session tokens, config)
/// 2. A unified application error used for control flow
/// 3. HTTP response mapping with structured logging
/// 4. Error context enrichment for request-scoped diagnostics

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} bytes)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Credential hasher errors
///
/// A malformed or foreign record is never an error: verification simply
/// reports "no match". Only the legacy tripwire and environment failures
/// surface here.
#[derive(Debug)]
pub enum PasswordError {
    /// The stored record uses the retired bcrypt scheme and must be migrated.
    LegacyHash,
    /// Hash options rejected before running the KDF.
    InvalidParams(String),
    /// The key derivation function itself failed.
    Kdf(String),
    /// The operating system could not provide random bytes for a salt.
    Randomness(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::LegacyHash => write!(
                f,
                "Encountered legacy bcrypt hash; credentials must be re-hashed with the current scheme"
            ),
            PasswordError::InvalidParams(msg) => write!(f, "Invalid password hash parameters: {}", msg),
            PasswordError::Kdf(msg) => write!(f, "Key derivation failed: {}", msg),
            PasswordError::Randomness(msg) => write!(f, "Salt generation failed: {}", msg),
        }
    }
}

impl StdError for PasswordError {}

/// Session token verification failures
///
/// These never reach a client. The session resolver logs them and treats
/// the request as anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    NoSecretConfigured,
    Malformed(String),
    UnsupportedAlgorithm(String),
    SignatureMismatch,
    Expired,
    NotYetValid,
    MissingSubject,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::NoSecretConfigured => write!(f, "No session secret configured"),
            TokenError::Malformed(msg) => write!(f, "Malformed token: {}", msg),
            TokenError::UnsupportedAlgorithm(alg) => write!(f, "Unsupported token algorithm: {}", alg),
            TokenError::SignatureMismatch => write!(f, "Token signature mismatch"),
            TokenError::Expired => write!(f, "Token has expired"),
            TokenError::NotYetValid => write!(f, "Token is not valid yet"),
            TokenError::MissingSubject => write!(f, "Token has no string subject"),
        }
    }
}

impl StdError for TokenError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication and authorization errors
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    MissingIdentity,
    /// Stored credential uses a retired scheme; the account needs a reset.
    CredentialMigrationRequired,
    EmailTaken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingIdentity => write!(f, "Not authenticated"),
            AuthError::CredentialMigrationRequired => {
                write!(f, "Stored credential requires migration")
            }
            AuthError::EmailTaken => write!(f, "Email already registered"),
        }
    }
}

impl StdError for AuthError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Password(PasswordError),
    Auth(AuthError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Password(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS (Control Flow Error Conversion)
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Password(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING (Operator/System Error Handling)
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                e.to_string(),
            ),

            // Every credential failure looks the same from the outside,
            // including the legacy-hash tripwire.
            AppError::Password(PasswordError::LegacyHash)
            | AppError::Auth(AuthError::InvalidCredentials)
            | AppError::Auth(AuthError::CredentialMigrationRequired) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS".to_string(),
                "Invalid credentials".to_string(),
            ),

            AppError::Password(PasswordError::InvalidParams(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                "Server configuration error".to_string(),
            ),

            AppError::Password(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),

            AppError::Auth(AuthError::MissingIdentity) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED".to_string(),
                "Not authenticated".to_string(),
            ),

            AppError::Auth(AuthError::EmailTaken) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY".to_string(),
                "Email already registered".to_string(),
            ),

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR".to_string(),
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code,
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Validation error"
                );
            }
            AppError::Password(PasswordError::LegacyHash)
            | AppError::Auth(AuthError::CredentialMigrationRequired) => {
                tracing::error!(
                    request_id = request_id,
                    error = %self,
                    "Legacy credential requires migration"
                );
            }
            AppError::Password(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Password hashing error"
                );
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %self,
                    "Invalid credentials attempt"
                );
            }
            AppError::Auth(e) => {
                tracing::warn!(
                    request_id = request_id,
                    error = %e,
                    "Authentication error"
                );
            }
            AppError::Config(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Configuration error"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(
                    request_id = request_id,
                    error = %msg,
                    "Internal error"
                );
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Password(PasswordError::LegacyHash) => StatusCode::UNAUTHORIZED,
            AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(AuthError::EmailTaken) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Error context for enhanced logging and debugging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        match error {
            AppError::Validation(_) | AppError::Auth(_) => {
                tracing::warn!(
                    error = %error,
                    context = ?context,
                    "Request rejected"
                );
            }
            _ => {
                tracing::error!(
                    error = %error,
                    context = ?context,
                    "Request failed"
                );
            }
        }
    }
}
