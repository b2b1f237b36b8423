use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Clone, Debug)]
pub struct ReservationConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors_allowed_origins: Vec<String>,
    pub service_name: String,
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl ReservationConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("RESERVATION_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("RESERVATION_SERVICE_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()?;

        let db_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()?;
        let min_connections = env::var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()?;

        // Comma-separated list of allowed frontend origins.
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| {
                "http://localhost:3000,http://127.0.0.1:3000,http://localhost:3001".to_string()
            })
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info,reservation_service=debug,sqlx=warn".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                max_connections,
                min_connections,
            },
            cors_allowed_origins,
            service_name: "reservation-service".to_string(),
            log_level,
        })
    }
}
