//! Application startup and lifecycle management.

use crate::config::ReservationConfig;
use crate::handlers::{clients, invoices, movements, reports, reservations, rooms, users};
use crate::services::{get_metrics, init_metrics, Database, ReportService};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ReservationConfig,
    pub db: Database,
    pub reports: ReportService,
}

async fn welcome() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to the hotel reservation system" }))
}

/// Health check endpoint for liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "reservation-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "reservation-service"
                })),
            )
        }
    }
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ReservationConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build without running migrations, for tests that manage the schema.
    pub async fn build_without_migrations(
        config: ReservationConfig,
    ) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: ReservationConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        // The report service gets its own handle to the store; nothing looks
        // the pool up from ambient state.
        let reports = ReportService::new(db.clone());

        let state = AppState {
            config: config.clone(),
            db,
            reports,
        };

        // Port 0 binds a random free port for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to bind listener to {}", addr);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "reservation-service listening");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state for sharing with tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

/// Assemble the full router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/clientes",
            post(clients::create_client).get(clients::list_clients),
        )
        .route(
            "/clientes/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/habitaciones",
            post(rooms::create_room).get(rooms::list_rooms),
        )
        .route(
            "/habitaciones/:id",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route(
            "/reservas",
            post(reservations::create_reservation).get(reservations::list_reservations),
        )
        .route(
            "/reservas/:id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/usuarios", post(users::create_user).get(users::list_users))
        .route("/usuarios/login", post(users::login))
        .route(
            "/usuarios/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/roles", get(users::list_roles))
        .route(
            "/ingresos",
            post(movements::create_income).get(movements::list_incomes),
        )
        .route(
            "/ingresos/:id",
            get(movements::get_income).delete(movements::delete_income),
        )
        .route(
            "/egresos",
            post(movements::create_expense).get(movements::list_expenses),
        )
        .route(
            "/egresos/:id",
            get(movements::get_expense).delete(movements::delete_expense),
        )
        .route(
            "/facturas",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/facturas/:id", get(invoices::get_invoice))
        .route("/facturas/:id/anular", put(invoices::void_invoice))
        .route("/facturas/:id/pagos", get(invoices::list_invoice_payments))
        .route("/pagos", post(invoices::create_payment))
        .route("/reportes/libro-diario", get(reports::daily_ledger))
        .route("/reportes/registro-huespedes", get(reports::guest_registry))
        .route("/reportes/registro-ocupacion", get(reports::room_occupancy))
        .route("/reportes/dashboard", get(reports::dashboard))
        .route("/reportes/dashboard/exportar", get(reports::export_dashboard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
