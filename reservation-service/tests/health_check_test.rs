//! Liveness and observability endpoints.

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_reports_ok() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "reservation-service");
}

#[tokio::test]
async fn welcome_message_at_root() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!("{}/", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body = response.text().await.unwrap();
    assert!(body.contains("reservation_db_query_duration_seconds"));
}
