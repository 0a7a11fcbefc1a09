use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{ConfigSecrets, SecretResolver, SessionResolver};
use crate::configuration::AuthSettings;
use crate::error::ConfigError;
use crate::logger::LoggerMiddleware;
use crate::middleware::SessionMiddleware;
use crate::routes::{current_session, current_user, health_check, login, register, DecoyCredential};
use crate::users::UserStore;

/// Check auth settings once at startup
///
/// Unusable password options are fatal. A missing session secret is only
/// reported: every request is then anonymous until one is provisioned.
///
/// # Errors
/// Returns `ConfigError::InvalidValue` for unusable password options
pub fn check_auth_settings(settings: &AuthSettings) -> Result<(), ConfigError> {
    settings
        .password
        .validate()
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let secrets = SecretResolver::with_config_and_env(
        ConfigSecrets::new(settings.secrets.clone()),
        &settings.secret_names,
    );
    match secrets.resolve() {
        Some(secret) => tracing::info!(
            source = secret.source,
            name = %secret.name,
            "Session secret resolved"
        ),
        None => tracing::warn!(
            error = %ConfigError::MissingRequired(settings.secret_names.join(" or ")),
            "No session secret configured; all requests will be anonymous"
        ),
    }

    Ok(())
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn UserStore>,
    auth: AuthSettings,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let password_options = web::Data::new(auth.password);
    let decoy = DecoyCredential::new(&auth.password)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let decoy = web::Data::new(decoy);
    let resolver = Arc::new(SessionResolver::from_settings(&auth));

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(SessionMiddleware::new(Arc::clone(&resolver)))
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(store.clone())
            .app_data(password_options.clone())
            .app_data(decoy.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/session", web::get().to(current_session))

            // Routes requiring a verified session
            .service(web::scope("/api").route("/me", web::get().to(current_user)))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HashOptions;

    #[test]
    fn test_invalid_password_options_are_fatal() {
        let settings = AuthSettings {
            password: HashOptions {
                cost: 1000,
                ..HashOptions::default()
            },
            ..AuthSettings::default()
        };

        assert!(matches!(
            check_auth_settings(&settings),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_missing_secret_is_not_fatal() {
        let settings = AuthSettings {
            secret_names: vec!["CIRCLECAST_TEST_UNSET_SECRET".to_string()],
            ..AuthSettings::default()
        };

        assert!(check_auth_settings(&settings).is_ok());
    }
}
