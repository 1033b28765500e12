mod common;

use std::str::FromStr;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{json_body, TestApp};
use healthlink_api::auth::{Role, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

#[tokio::test]
async fn health_reports_the_database_up() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn requests_without_a_principal_are_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api/v1/inventory/reorder-suggestions", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("x-actor-id"));
}

#[tokio::test]
async fn unknown_roles_are_unauthorized() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/reports/stock-levels")
        .header(ACTOR_ID_HEADER, app.actor.to_string())
        .header(ACTOR_ROLE_HEADER, "Janitor")
        .body(Body::empty())
        .unwrap();
    let response = healthlink_api::app_router(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctors_may_not_dispense() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/dispense",
            Some(json!({
                "prescription_id": 1,
                "quantity": 1,
                "payment_method": "Cash",
                "amount_paid": "2"
            })),
            Some(Role::Doctor),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn registering_an_item_returns_201_with_the_envelope() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/inventory/items",
            Some(json!({
                "name": "Tramadol 50mg",
                "unit": "Capsule",
                "initial_stock": "40",
                "reorder_level": "10",
                "purchase_price": "3"
            })),
            Some(Role::Pharmacist),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["stock_item"]["name"], "Tramadol 50mg");
    assert_eq!(decimal(&body["data"]["stock_item"]["current_stock"]), dec!(40));
    assert_eq!(body["data"]["history_entry"]["transaction_type"], "In");

    let id = body["data"]["stock_item"]["id"].as_i64().unwrap();
    let fetched = app
        .request(
            Method::GET,
            &format!("/api/v1/inventory/items/{}", id),
            None,
            Some(Role::Nurse),
        )
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);

    let history = app
        .request(
            Method::GET,
            &format!("/api/v1/inventory/items/{}/history", id),
            None,
            Some(Role::Nurse),
        )
        .await;
    assert_eq!(history.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dispensing_over_http_returns_the_result_and_a_request_id() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Prednisolone 5mg", dec!(100), dec!(10), None).await;
    let med = app.seed_medication("Prednisolone 5mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 50, 0).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/dispense",
            Some(json!({
                "prescription_id": rx.id,
                "quantity": 30,
                "payment_method": "Cash",
                "amount_paid": "60"
            })),
            Some(Role::Nurse),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["prescription_status"], "Partially Dispensed");
    assert_eq!(body["data"]["remaining_quantity"], 20);
    assert_eq!(decimal(&body["data"]["new_stock_level"]), dec!(70));
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(70));
}

#[tokio::test]
async fn dispensing_errors_map_to_status_codes() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Warfarin 5mg", dec!(3), dec!(1), None).await;
    let med = app.seed_medication("Warfarin 5mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 10, 0).await;

    let short = app
        .request(
            Method::POST,
            "/api/v1/dispense",
            Some(json!({
                "prescription_id": rx.id,
                "quantity": 5,
                "payment_method": "Cash",
                "amount_paid": "10"
            })),
            Some(Role::Pharmacist),
        )
        .await;
    assert_eq!(short.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = app
        .request(
            Method::POST,
            "/api/v1/dispense",
            Some(json!({
                "prescription_id": 4242,
                "quantity": 1,
                "payment_method": "Cash",
                "amount_paid": "2"
            })),
            Some(Role::Pharmacist),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/inventory/items")
        .header(ACTOR_ID_HEADER, app.actor.to_string())
        .header(ACTOR_ROLE_HEADER, "Pharmacist")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = healthlink_api::app_router(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_default_to_the_callers_facility() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Machakos Level 5").await;
    let supplier = app.seed_supplier("Eastern Pharma").await;
    let item = app.seed_stock_item("Carbamazepine 200mg", dec!(0), dec!(30), None).await;

    let response = app
        .request_with_facility(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "supplier_id": supplier.id,
                "items": [{ "stock_item_id": item.id, "quantity": "30" }]
            })),
            Some(Role::Pharmacist),
            Some(facility.id),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    assert_eq!(body["data"]["facility_id"], facility.id);
    assert_eq!(body["data"]["status"], "Ordered");
    assert_eq!(decimal(&body["data"]["total_amount"]), dec!(60));

    let order_id = body["data"]["id"].as_i64().unwrap();
    let received = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/receive", order_id),
            None,
            Some(Role::Pharmacist),
        )
        .await;
    assert_eq!(received.status(), StatusCode::OK);
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(30));
}

#[tokio::test]
async fn report_queries_are_validated() {
    let app = TestApp::new().await;

    let inverted = app
        .request(
            Method::GET,
            "/api/v1/reports/medication-usage?start_date=2026-03-10&end_date=2026-03-01",
            None,
            Some(Role::Doctor),
        )
        .await;
    assert_eq!(inverted.status(), StatusCode::BAD_REQUEST);

    let garbled = app
        .request(
            Method::GET,
            "/api/v1/reports/medication-usage?start_date=yesterday",
            None,
            Some(Role::Doctor),
        )
        .await;
    assert_eq!(garbled.status(), StatusCode::BAD_REQUEST);

    let ok = app
        .request(
            Method::GET,
            "/api/v1/reports/expiring-medications?months=3",
            None,
            Some(Role::Pharmacist),
        )
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let body = json_body(ok).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_expiry_windows_are_a_bad_request() {
    let app = TestApp::new().await;
    for months in ["100000000", "9223372036854775807"] {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/reports/expiring-medications?months={}", months),
                None,
                Some(Role::Pharmacist),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("latest supported date"));
    }

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/api/v1/dispense"].is_object());
}
