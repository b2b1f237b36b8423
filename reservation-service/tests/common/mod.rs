//! Common test utilities for reservation-service integration tests.

use reservation_service::config::{DatabaseConfig, ReservationConfig, ServerConfig};
use reservation_service::startup::Application;
use secrecy::Secret;
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,reservation_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

/// Spawn the application against TEST_DATABASE_URL on a random port.
/// Integration tests are skipped (None) when the variable is not set.
pub async fn spawn_app() -> Option<TestApp> {
    init_tracing();

    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };

    let config = ReservationConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: Secret::new(database_url),
            max_connections: 2,
            min_connections: 1,
        },
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        service_name: "reservation-service-test".to_string(),
        log_level: "debug".to_string(),
    };

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    let client = reqwest::Client::new();
    let address = format!("http://127.0.0.1:{}", port);

    // Wait for the server to accept connections.
    let mut attempts = 0;
    loop {
        match client.get(format!("{}/health", address)).send().await {
            Ok(_) => break,
            Err(_) if attempts < 20 => {
                attempts += 1;
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            Err(e) => panic!("Server did not come up after 20 attempts: {}", e),
        }
    }

    Some(TestApp { address, client })
}

/// Unique-enough suffix for identifiers in a shared test database.
pub fn unique_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch");
    format!("{}{:09}", now.as_secs(), now.subsec_nanos())
}

/// Short variant for tightly constrained columns (room numbers).
pub fn short_suffix() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch");
    format!("{:09}", now.subsec_nanos())
}
