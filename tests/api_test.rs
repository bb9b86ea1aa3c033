mod common;

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;

use common::TestApp;
use window_production::{auth::Role, domain::MaterialType};

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
    assert_eq!(body["timestamp"], common::start_of_shift().to_rfc3339());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/production/orders"].is_object());
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::GET, "/api/v1/production/orders", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let app = TestApp::new().await;
    app.seed_materials(dec!(100)).await;
    let window = app.seed_window(1000, 1000).await;

    let payload = json!({
        "customer_name": "Jan Nowak",
        "customer_email": "jan@example.com",
        "product_description": "Oak casement windows",
        "priority": "high",
        "items": [{ "window_id": window.id, "quantity": 2 }]
    });
    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/production/orders",
            Some(Role::Production),
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order_number"], "PRD-2026-0001");
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/production/orders/{}/start", id),
            Some(Role::Warehouse),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, started) = app
        .request(
            Method::POST,
            &format!("/api/v1/production/orders/{}/start", id),
            Some(Role::Production),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "in_progress");
    assert_eq!(started["production_time_hours"], 4);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/api/v1/production/orders/{}/start", id),
            Some(Role::Production),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("cannot start production order in status in_progress"));

    let (status, details) = app
        .request(
            Method::GET,
            &format!("/api/v1/production/orders/{}", id),
            Some(Role::Warehouse),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["materials"].as_array().unwrap().len(), 3);
    assert_eq!(details["timeline"].as_array().unwrap().len(), 2);

    let (status, page) = app
        .request(
            Method::GET,
            "/api/v1/production/orders?status=in_progress&per_page=5",
            Some(Role::Admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["pagination"]["per_page"], 5);
    assert_eq!(page["data"][0]["id"], id.as_str());
}

#[tokio::test]
async fn shortfall_is_reported_with_details() {
    let app = TestApp::new().await;
    app.seed_material(MaterialType::Profile, dec!(10), dec!(0))
        .await;
    app.seed_material(MaterialType::Glass, dec!(50), dec!(0))
        .await;
    app.seed_material(MaterialType::Hardware, dec!(50), dec!(0))
        .await;
    let window = app.seed_window(1000, 1000).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/production/orders",
            Some(Role::Admin),
            Some(json!({
                "product_description": "Standard windows",
                "items": [{ "window_id": window.id, "quantity": 3 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["shortfalls"][0]["material_type"], "profile");
}

#[tokio::test]
async fn invalid_payload_is_a_bad_request() {
    let app = TestApp::new().await;
    let window = app.seed_window(1000, 1000).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/production/orders",
            Some(Role::Admin),
            Some(json!({
                "customer_email": "not-an-email",
                "product_description": "Standard windows",
                "items": [{ "window_id": window.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/production/orders/{}", uuid::Uuid::new_v4()),
            Some(Role::Production),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn only_warehouse_staff_manage_stock() {
    let app = TestApp::new().await;
    let glass = app
        .seed_material(MaterialType::Glass, dec!(10), dec!(2))
        .await;
    let uri = format!("/api/v1/materials/{}/credit", glass.id);
    let body = json!({ "quantity": "5", "reason": "supplier delivery" });

    let (status, _) = app
        .request(Method::POST, &uri, Some(Role::Production), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, movement) = app
        .request(Method::POST, &uri, Some(Role::Warehouse), Some(body))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(movement["direction"], "in");

    let (status, low) = app
        .request(Method::GET, "/api/v1/materials/low-stock", Some(Role::Production), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(low.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn legacy_vocabulary_is_accepted_and_stored_canonically() {
    let app = TestApp::new().await;
    app.seed_materials(dec!(100)).await;
    let window = app.seed_window(1000, 1000).await;

    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/production/orders",
            Some(Role::Production),
            Some(json!({
                "product_description": "Imported order",
                "priority": "pilne",
                "items": [{ "window_id": window.id, "quantity": 1 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["priority"], "urgent");

    let (status, page) = app
        .request(
            Method::GET,
            "/api/v1/production/orders?status=nowe",
            Some(Role::Production),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total"], 1);
    assert_eq!(page["data"][0]["status"], "pending");

    let (status, material) = app
        .request(
            Method::POST,
            "/api/v1/materials",
            Some(Role::Warehouse),
            Some(json!({
                "name": "Float glass 4mm",
                "material_type": "szyba",
                "unit": "m2"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(material["material_type"], "glass");
}
