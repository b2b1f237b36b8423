//! Reporting and export integration tests.

mod common;

use common::{spawn_app, unique_suffix};
use serde_json::json;

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let Some(app) = spawn_app().await else { return };

    for path in [
        "/reportes/libro-diario",
        "/reportes/registro-huespedes",
        "/reportes/registro-ocupacion",
    ] {
        let response = app
            .client
            .get(format!(
                "{}{}?fecha_inicio=2024-02-01&fecha_fin=2024-01-01",
                app.address, path
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{} accepted an inverted range", path);
    }
}

#[tokio::test]
async fn unknown_movement_kind_is_rejected() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!(
            "{}/reportes/libro-diario?tipo=transferencia",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn ledger_window_and_kind_filters_apply() {
    let Some(app) = spawn_app().await else { return };

    let tag = unique_suffix();
    let inside = format!("inside-{}", tag);
    let outside = format!("outside-{}", tag);

    // One income inside the window, one expense outside it.
    let response = app
        .client
        .post(format!("{}/ingresos", app.address))
        .json(&json!({ "date": "2020-01-10", "description": inside, "amount": "75.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .post(format!("{}/egresos", app.address))
        .json(&json!({ "date": "2020-02-10", "description": outside, "amount": "5.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .get(format!(
            "{}/reportes/libro-diario?fecha_inicio=2020-01-01&fecha_fin=2020-01-31",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains(&inside));
    assert!(!body.contains(&outside));

    // Kind filter returns only matching rows.
    let response = app
        .client
        .get(format!("{}/reportes/libro-diario?tipo=expense", app.address))
        .send()
        .await
        .unwrap();
    let rows: Vec<serde_json::Value> = response.json().await.unwrap();
    assert!(rows.iter().all(|row| row["kind"] == "expense"));
}

#[tokio::test]
async fn negative_movement_amount_is_rejected() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .post(format!("{}/ingresos", app.address))
        .json(&json!({ "date": "2020-03-01", "description": "bad", "amount": "-10.00" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn dashboard_has_summary_kpis_and_period() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!("{}/reportes/dashboard", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["period"]["label"], "Entire history");
    assert!(body["summary"]["total_income"].is_string());
    assert!(body["summary"]["net_balance"].is_string());
    let status = body["kpis"]["financial_status"].as_str().unwrap();
    assert!(status == "Positive" || status == "Negative");
    assert!(body["generated_at"].is_string());

    // The live feed is capped at 10 entries.
    if let Some(feed) = body.get("recent_movements").and_then(|m| m.as_array()) {
        assert!(feed.len() <= 10);
    }
}

#[tokio::test]
async fn unknown_export_format_and_period_are_rejected() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!(
            "{}/reportes/dashboard/exportar?formato=unknown",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .client
        .get(format!(
            "{}/reportes/dashboard/exportar?formato=structured&periodo=last_week",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn export_formats_set_media_type_and_attachment() {
    let Some(app) = spawn_app().await else { return };

    for (format, media_type) in [
        ("structured", "application/json"),
        ("tabular", "text/csv"),
        ("multi-section-tabular", "application/vnd.ms-excel"),
    ] {
        let response = app
            .client
            .get(format!(
                "{}/reportes/dashboard/exportar?formato={}&periodo=all",
                app.address, format
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "format {} failed", format);

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(
            content_type.starts_with(media_type),
            "format {} returned media type {}",
            format,
            content_type
        );

        let disposition = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.contains("attachment"));
        assert!(disposition.contains("dashboard_export_"));
    }
}

#[tokio::test]
async fn export_without_movements_omits_the_section() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .get(format!(
            "{}/reportes/dashboard/exportar?formato=tabular&incluir_movimientos=false",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("=== FINANCIAL SUMMARY ==="));
    assert!(!body.contains("=== RECENT MOVEMENTS ==="));
}

#[tokio::test]
async fn guest_registry_filters_by_document() {
    let Some(app) = spawn_app().await else { return };

    let document = format!("G{}", &unique_suffix()[..18]);

    let response = app
        .client
        .post(format!("{}/clientes", app.address))
        .json(&json!({ "name": "Registry Guest", "document_id": document }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let client: serde_json::Value = response.json().await.unwrap();

    let response = app
        .client
        .post(format!("{}/habitaciones", app.address))
        .json(&json!({
            "number": format!("G{}", common::short_suffix()),
            "room_type": "single",
            "price_per_night": "40.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let room: serde_json::Value = response.json().await.unwrap();

    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client["id"],
            "room_id": room["id"],
            "start_date": "2030-10-01",
            "end_date": "2030-10-03",
            "status": "confirmed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .get(format!(
            "{}/reportes/registro-huespedes?documento_identidad={}",
            app.address, document
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let records: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["client"], "Registry Guest");
    assert_eq!(records[0]["room_type"], "single");
}
