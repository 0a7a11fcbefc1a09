/// Request session resolution
///
/// Ties token extraction and verification together. Every failure is
/// logged for operators and collapses to `None`: callers only ever learn
/// whether the request carries a verified identity.

use crate::auth::claims::Identity;
use crate::auth::extract::extract_token;
use crate::auth::secrets::{ConfigSecrets, SecretResolver};
use crate::auth::token::TokenVerifier;
use crate::configuration::AuthSettings;
use crate::error::TokenError;

#[derive(Debug, Clone)]
pub struct SessionResolver {
    verifier: TokenVerifier,
    cookie_names: Vec<String>,
}

impl SessionResolver {
    pub fn new(verifier: TokenVerifier, cookie_names: Vec<String>) -> Self {
        Self {
            verifier,
            cookie_names,
        }
    }

    /// Build a resolver that reads secrets from `settings`, then from the
    /// process environment
    pub fn from_settings(settings: &AuthSettings) -> Self {
        let secrets = SecretResolver::with_config_and_env(
            ConfigSecrets::new(settings.secrets.clone()),
            &settings.secret_names,
        );
        Self::new(TokenVerifier::new(secrets), settings.cookie_names.clone())
    }

    /// Resolve the identity carried by a request
    ///
    /// # Arguments
    /// * `authorization` - Raw `Authorization` header, if present
    /// * `cookie` - Cookie lookup by name
    pub fn resolve_session<F>(&self, authorization: Option<&str>, cookie: F) -> Option<Identity>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(token) = extract_token(authorization, &self.cookie_names, cookie) else {
            tracing::debug!("No session token on request");
            return None;
        };
        self.resolve_token(&token)
    }

    /// Verify a bare token, logging the reason when it is refused
    pub fn resolve_token(&self, token: &str) -> Option<Identity> {
        match self.verifier.verify(token) {
            Ok(identity) => {
                tracing::debug!(user_id = %identity.user_id, "Session token verified");
                Some(identity)
            }
            Err(TokenError::NoSecretConfigured) => {
                tracing::warn!(
                    "No session secret configured; treating request as anonymous"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid session token");
                None
            }
        }
    }
}
