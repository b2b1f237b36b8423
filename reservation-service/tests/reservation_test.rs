//! Reservation integration tests.

mod common;

use common::{short_suffix, spawn_app, unique_suffix};
use serde_json::json;

async fn create_client(app: &common::TestApp) -> i64 {
    let response = app
        .client
        .post(format!("{}/clientes", app.address))
        .json(&json!({
            "name": "Guest",
            "document_id": format!("R{}", &unique_suffix()[..18])
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

async fn create_room(app: &common::TestApp) -> i64 {
    let response = app
        .client
        .post(format!("{}/habitaciones", app.address))
        .json(&json!({
            "number": format!("R{}", short_suffix()),
            "room_type": "double",
            "price_per_night": "85.00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn reservation_with_inverted_dates_is_rejected_before_store_access() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": 1,
            "room_id": 1,
            "start_date": "2030-05-10",
            "end_date": "2030-05-01"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn reservation_for_missing_client_is_not_found() {
    let Some(app) = spawn_app().await else { return };

    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": 999999999,
            "room_id": 1,
            "start_date": "2030-05-01",
            "end_date": "2030-05-05"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn overlapping_reservation_on_same_room_conflicts() {
    let Some(app) = spawn_app().await else { return };

    let client_id = create_client(&app).await;
    let room_id = create_room(&app).await;

    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client_id,
            "room_id": room_id,
            "start_date": "2030-06-01",
            "end_date": "2030-06-10",
            "status": "confirmed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    assert_eq!(created["status"], "confirmed");
    assert_eq!(created["end_date"], "2030-06-10");

    // Same room, overlapping window
    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client_id,
            "room_id": room_id,
            "start_date": "2030-06-05",
            "end_date": "2030-06-12"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Same room, disjoint window is fine
    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client_id,
            "room_id": room_id,
            "start_date": "2030-07-01",
            "end_date": "2030-07-05"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn open_ended_stay_blocks_everything_after_it() {
    let Some(app) = spawn_app().await else { return };

    let client_id = create_client(&app).await;
    let room_id = create_room(&app).await;

    // Ongoing stay with no end date
    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client_id,
            "room_id": room_id,
            "start_date": "2030-08-01",
            "status": "confirmed"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    assert!(created["end_date"].is_null());

    let response = app
        .client
        .post(format!("{}/reservas", app.address))
        .json(&json!({
            "client_id": client_id,
            "room_id": room_id,
            "start_date": "2031-01-01",
            "end_date": "2031-01-05"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}
