use std::net::TcpListener;
use std::sync::Arc;

use circlecast::configuration::get_configuration;
use circlecast::startup::{check_auth_settings, run};
use circlecast::telemetry::init_telemetry;
use circlecast::users::InMemoryUserStore;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    check_auth_settings(&configuration.auth).map_err(|e| {
        tracing::error!("Invalid auth settings: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let store = Arc::new(InMemoryUserStore::new());

    let address = configuration.application.address();
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, store, configuration.auth)?;
    tracing::info!("Server started successfully");

    server.await
}
