use std::collections::HashMap;

use config::ConfigError;

use crate::auth::{default_cookie_names, HashOptions};

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session and credential settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// Secret names to try, in order
    #[serde(default = "default_secret_names")]
    pub secret_names: Vec<String>,
    /// Secrets supplied through configuration; the process environment is
    /// consulted after these
    #[serde(default)]
    pub secrets: HashMap<String, String>,
    /// Session cookie names to try, in order
    #[serde(default = "default_cookie_names")]
    pub cookie_names: Vec<String>,
    #[serde(default)]
    pub password: HashOptions,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret_names", &self.secret_names)
            .field("secrets", &self.secrets.keys().collect::<Vec<_>>())
            .field("cookie_names", &self.cookie_names)
            .field("password", &self.password)
            .finish()
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_names: default_secret_names(),
            secrets: HashMap::new(),
            cookie_names: default_cookie_names(),
            password: HashOptions::default(),
        }
    }
}

pub fn default_secret_names() -> Vec<String> {
    vec!["AUTH_SECRET".to_string(), "NEXTAUTH_SECRET".to_string()]
}

/// Load settings from defaults, an optional `configuration` file, and
/// `APP__`-prefixed environment variables (e.g. `APP__APPLICATION__PORT`)
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ConfigSecrets, SecretSource};

    #[test]
    fn test_defaults_deserialize() {
        let settings = config::Config::builder()
            .set_default("application.host", "127.0.0.1")
            .unwrap()
            .set_default("application.port", 8080)
            .unwrap()
            .set_default("auth.secrets.AUTH_SECRET", "from-config")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize settings");

        assert_eq!(settings.application.address(), "127.0.0.1:8080");
        assert_eq!(settings.auth.secret_names, default_secret_names());
        assert_eq!(settings.auth.cookie_names, default_cookie_names());
        assert_eq!(settings.auth.password, HashOptions::default());
        // Key case is not guaranteed to survive the config layer.
        let secrets = ConfigSecrets::new(settings.auth.secrets.clone());
        assert_eq!(secrets.lookup("AUTH_SECRET").as_deref(), Some("from-config"));
    }

    #[test]
    fn test_password_overrides() {
        let settings = config::Config::builder()
            .set_default("application.host", "0.0.0.0")
            .unwrap()
            .set_default("application.port", 3030)
            .unwrap()
            .set_default("auth.password.cost", 32768)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();

        assert_eq!(settings.auth.password.cost, 32768);
        assert_eq!(settings.auth.password.block_size, 8);
    }

    #[test]
    fn test_debug_hides_secret_values() {
        let mut secrets = HashMap::new();
        secrets.insert("AUTH_SECRET".to_string(), "hunter2-hunter2".to_string());
        let auth = AuthSettings {
            secret_names: default_secret_names(),
            secrets,
            cookie_names: default_cookie_names(),
            password: HashOptions::default(),
        };

        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("AUTH_SECRET"));
        assert!(!rendered.contains("hunter2"));
    }
}
