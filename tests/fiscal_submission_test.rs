//! Tests for fiscal submission against a mocked provider: tax
//! desegregation in the payload, final-consumer fallback, failure
//! isolation from the order, and explicit retry.

mod common;

use std::time::Duration;

use axum::body::to_bytes;
use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

async fn app_against(server: &MockServer) -> TestApp {
    let base_url = server.uri();
    TestApp::with_config(move |cfg| {
        cfg.fiscal.base_url = base_url;
        cfg.fiscal.dispatch_delay_secs = 0;
        cfg.fiscal.max_retries = 1;
        cfg.fiscal.timeout_secs = 2;
    })
    .await
}

async fn create_and_complete(app: &TestApp, order: Value) -> String {
    let response = app.request(Method::POST, "/api/v1/orders", Some(order)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = body["data"]["id"].as_str().expect("order id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/complete", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    order_id
}

/// The submission runs on a background task; poll the document endpoint
/// until it reaches the expected status.
async fn wait_for_document(app: &TestApp, order_id: &str, expected: &str) -> Value {
    let uri = format!("/api/v1/fiscal/orders/{}", order_id);
    for _ in 0..100 {
        let response = app.request(Method::GET, &uri, None).await;
        if response.status() == StatusCode::OK {
            let body = response_json(response).await;
            if body["data"]["status"] == expected {
                return body["data"].clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("fiscal document for {} never became {}", order_id, expected);
}

fn authorized_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "invoice": {
            "number": "001-001-000012345",
            "access_key": "2508202501099999999900110010010000123451234567819",
            "authorization_date": "2025-08-25T12:00:00Z"
        }
    }))
}

#[tokio::test]
async fn completed_order_is_submitted_and_authorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(authorized_response())
        .expect(1)
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let product = app.seed_product("Almuerzo", dec!(15.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    let document = wait_for_document(&app, &order_id, "authorized").await;
    assert_eq!(document["fiscal_number"], "001-001-000012345");
    assert!(document["authorized_at"].is_string());
    assert!(document["error_message"].is_null());

    // Inspect the payload the provider actually received.
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
    let payload: Value = serde_json::from_slice(&requests[0].body).expect("payload json");

    // No customer on the order: generic final-consumer identity.
    assert_eq!(payload["customer_identification"], "9999999999999");
    assert_eq!(payload["customer_identification_type"], "07");
    assert_eq!(payload["customer_name"], "CONSUMIDOR FINAL");

    // 15.00 tax-inclusive at 15% desegregates to 13.04.
    let unit_price: Decimal = payload["items"][0]["unit_price"]
        .as_str()
        .expect("unit price")
        .parse()
        .expect("decimal");
    assert_eq!(unit_price, dec!(13.04));
    assert_eq!(payload["items"][0]["tax_code"], "2");
    assert_eq!(payload["items"][0]["quantity"], 1);
}

#[tokio::test]
async fn zero_rate_lines_keep_their_price_and_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(authorized_response())
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let customer = app.seed_customer("Maria Perez", Some("0912345678")).await;
    let exempt = app.seed_product("Pan", dec!(0.50), dec!(0), 50).await;
    let taxed = app.seed_product("Gaseosa", dec!(1.12), dec!(12), 50).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_id": customer.id,
            "channel": "pos",
            "items": [
                {"product_id": exempt.id, "quantity": 2},
                {"product_id": taxed.id, "quantity": 1}
            ]
        }),
    )
    .await;

    wait_for_document(&app, &order_id, "authorized").await;

    let requests = server.received_requests().await.expect("recorded requests");
    let payload: Value = serde_json::from_slice(&requests[0].body).expect("payload json");

    // Customer identity comes from the order snapshot, typed as a cedula.
    assert_eq!(payload["customer_identification"], "0912345678");
    assert_eq!(payload["customer_identification_type"], "05");
    assert_eq!(payload["customer_name"], "Maria Perez");

    let items = payload["items"].as_array().expect("items");
    let exempt_line = items.iter().find(|i| i["description"] == "Pan").unwrap();
    let taxed_line = items.iter().find(|i| i["description"] == "Gaseosa").unwrap();

    let exempt_price: Decimal = exempt_line["unit_price"].as_str().unwrap().parse().unwrap();
    let taxed_price: Decimal = taxed_line["unit_price"].as_str().unwrap().parse().unwrap();
    assert_eq!(exempt_price, dec!(0.50));
    assert_eq!(exempt_line["tax_code"], "0");
    assert_eq!(taxed_price, dec!(1.00));
    assert_eq!(taxed_line["tax_code"], "2");
}

#[tokio::test]
async fn provider_business_failure_marks_document_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "RUC emisor no autorizado"
        })))
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let product = app.seed_product("Ceviche", dec!(9.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    let document = wait_for_document(&app, &order_id, "failed").await;
    assert_eq!(document["error_message"], "RUC emisor no autorizado");
    assert!(document["fiscal_number"].is_null());
}

#[tokio::test]
async fn unreachable_provider_never_touches_the_order() {
    // Default harness config points at a closed port.
    let app = TestApp::new().await;
    let product = app.seed_product("Encebollado", dec!(4.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    let document = wait_for_document(&app, &order_id, "failed").await;
    assert!(document["error_message"].is_string());

    // The order itself is untouched by the fiscal failure.
    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["payment_status"], "paid");
}

#[tokio::test]
async fn failed_submission_can_be_retried_explicitly() {
    let server = MockServer::start().await;
    // First attempt: server error (retries exhausted). Then succeed.
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(authorized_response())
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let product = app.seed_product("Bolon", dec!(3.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    let failed = wait_for_document(&app, &order_id, "failed").await;
    let document_id = failed["id"].as_str().expect("document id").to_string();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/fiscal/orders/{}/retry", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let document = &body["data"];

    // Same record, updated in place.
    assert_eq!(document["id"], document_id.as_str());
    assert_eq!(document["status"], "authorized");
    assert_eq!(document["fiscal_number"], "001-001-000012345");
    assert!(document["error_message"].is_null());
}

#[tokio::test]
async fn retry_on_authorized_document_skips_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(authorized_response())
        .expect(1)
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let product = app.seed_product("Seco", dec!(6.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    wait_for_document(&app, &order_id, "authorized").await;

    // A second explicit retry returns the document without resubmitting;
    // the mock's expect(1) fails the test otherwise.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/fiscal/orders/{}/retry", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "authorized");
}

#[tokio::test]
async fn success_without_authorization_is_recorded_as_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "invoice": {"number": "001-001-000054321"}
        })))
        .mount(&server)
        .await;

    let app = app_against(&server).await;
    let product = app.seed_product("Fritada", dec!(7.00), dec!(15), 10).await;
    let order_id = create_and_complete(
        &app,
        json!({
            "customer_name": "Walk-in",
            "channel": "pos",
            "items": [{"product_id": product.id, "quantity": 1}]
        }),
    )
    .await;

    let document = wait_for_document(&app, &order_id, "sent").await;
    assert_eq!(document["fiscal_number"], "001-001-000054321");
    assert!(document["authorized_at"].is_null());
}

#[tokio::test]
async fn no_document_exists_before_completion() {
    let app = TestApp::new().await;
    let product = app.seed_product("Humita", dec!(2.00), dec!(15), 10).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_name": "Walk-in",
                "channel": "pos",
                "items": [{"product_id": product.id, "quantity": 1}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/fiscal/orders/{}", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Manual submission for a pending order is refused outright.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/fiscal/orders/{}/retry", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/fiscal/orders/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
