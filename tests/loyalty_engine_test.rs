//! Tests for loyalty earning: rule selection against seeded rules, the
//! idempotent award on order completion, and point redemption into coupons.

mod common;

use std::time::Duration;

use axum::body::to_bytes;
use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};
use uuid::Uuid;

use comanda_api::entities::{
    coupon::RewardKind,
    earning_rule::{RuleChannel, RuleKind},
    order::Entity as Order,
    point_transaction::{self, Entity as PointTransaction, TransactionKind},
};

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

fn decimal_field(value: &Value, field: &str) -> rust_decimal::Decimal {
    value[field]
        .as_str()
        .map(|s| s.parse().expect("decimal field should parse"))
        .unwrap_or_else(|| panic!("field {} missing from {}", field, value))
}

async fn create_order_for(
    app: &TestApp,
    customer_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    channel: &str,
) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer_id,
                "channel": channel,
                "items": [{"product_id": product_id, "quantity": quantity}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    body["data"]["id"].as_str().expect("order id").to_string()
}

async fn complete_order(app: &TestApp, order_id: &str) {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/complete", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Completion effects run on the event loop; poll the balance until the
/// award lands or the deadline passes.
async fn wait_for_balance(app: &TestApp, customer_id: Uuid, expected: i64) -> i64 {
    for _ in 0..100 {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/loyalty/{}/balance", customer_id),
                None,
            )
            .await;
        let body = response_json(response).await;
        let balance = body["data"]["points_balance"].as_i64().unwrap_or(0);
        if balance == expected {
            return balance;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/loyalty/{}/balance", customer_id),
            None,
        )
        .await;
    let body = response_json(response).await;
    body["data"]["points_balance"].as_i64().unwrap_or(0)
}

#[tokio::test]
async fn completing_a_paid_order_awards_points_once() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Ana Lopez", Some("0912345678")).await;
    // Tax-free product keeps the order total a round number: 3 x 20 = 60.
    let product = app.seed_product("Combo", dec!(20.00), dec!(0), 50).await;
    app.seed_earning_rule(
        "1 point per $10",
        RuleKind::PerAmountStep,
        dec!(0),
        1,
        Some(dec!(10)),
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 3, "pos").await;
    complete_order(&app, &order_id).await;

    // floor(60 / 10) * 1 = 6 points.
    assert_eq!(wait_for_balance(&app, customer.id, 6).await, 6);

    // Exactly one EARN ledger entry for the order.
    let earns = PointTransaction::find()
        .filter(point_transaction::Column::OrderId.eq(Uuid::parse_str(&order_id).unwrap()))
        .filter(point_transaction::Column::Kind.eq(TransactionKind::Earn))
        .all(app.state.db.as_ref())
        .await
        .expect("ledger query");
    assert_eq!(earns.len(), 1);
    assert_eq!(earns[0].points_change, 6);
}

#[tokio::test]
async fn highest_threshold_rule_wins_and_rules_never_stack() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Luis Vera", None).await;
    // 75.00 total, no tax.
    let product = app.seed_product("Feast", dec!(75.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "1 point per $10",
        RuleKind::PerAmountStep,
        dec!(0),
        1,
        Some(dec!(10)),
        RuleChannel::All,
    )
    .await;
    app.seed_earning_rule(
        "20 points above $50",
        RuleKind::FixedAboveThreshold,
        dec!(50),
        20,
        None,
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "pos").await;
    complete_order(&app, &order_id).await;

    // The fixed rule has the higher threshold the order clears: 20 points,
    // not floor(75/10) = 7, and never 27.
    assert_eq!(wait_for_balance(&app, customer.id, 20).await, 20);
}

#[tokio::test]
async fn channel_specific_rule_beats_all_on_equal_threshold() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Web Shopper", None).await;
    let product = app.seed_product("Bundle", dec!(30.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "5 points any channel",
        RuleKind::FixedAboveThreshold,
        dec!(10),
        5,
        None,
        RuleChannel::All,
    )
    .await;
    app.seed_earning_rule(
        "9 points on web",
        RuleKind::FixedAboveThreshold,
        dec!(10),
        9,
        None,
        RuleChannel::Web,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "web").await;
    complete_order(&app, &order_id).await;

    assert_eq!(wait_for_balance(&app, customer.id, 9).await, 9);
}

#[tokio::test]
async fn award_is_idempotent_per_order() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Carmen Diaz", None).await;
    let product = app.seed_product("Box", dec!(25.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "10 points above $20",
        RuleKind::FixedAboveThreshold,
        dec!(20),
        10,
        None,
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "pos").await;
    complete_order(&app, &order_id).await;
    assert_eq!(wait_for_balance(&app, customer.id, 10).await, 10);

    // Direct second award attempt for the same order is skipped, not an error.
    let order = Order::find_by_id(Uuid::parse_str(&order_id).unwrap())
        .one(app.state.db.as_ref())
        .await
        .expect("order lookup")
        .expect("order exists");
    let again = app
        .state
        .services
        .loyalty
        .award_for_order(&order)
        .await
        .expect("repeat award should not fail");
    assert_eq!(again, 0);

    let earns = PointTransaction::find()
        .filter(point_transaction::Column::OrderId.eq(order.id))
        .filter(point_transaction::Column::Kind.eq(TransactionKind::Earn))
        .all(app.state.db.as_ref())
        .await
        .expect("ledger query");
    assert_eq!(earns.len(), 1);
    assert_eq!(wait_for_balance(&app, customer.id, 10).await, 10);
}

#[tokio::test]
async fn orders_without_a_customer_earn_nothing() {
    let app = TestApp::new().await;
    let product = app.seed_product("Snack", dec!(30.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "10 points above $20",
        RuleKind::FixedAboveThreshold,
        dec!(20),
        10,
        None,
        RuleChannel::All,
    )
    .await;

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
    complete_order(&app, &order_id).await;

    // Give the event loop a moment, then verify no ledger entry appeared.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let earns = PointTransaction::find()
        .filter(point_transaction::Column::OrderId.eq(Uuid::parse_str(&order_id).unwrap()))
        .all(app.state.db.as_ref())
        .await
        .expect("ledger query");
    assert!(earns.is_empty());
}

#[tokio::test]
async fn below_threshold_orders_earn_nothing() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Pedro Ruiz", None).await;
    let product = app.seed_product("Cookie", dec!(1.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "50 points above $100",
        RuleKind::FixedAboveThreshold,
        dec!(100),
        50,
        None,
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "pos").await;
    complete_order(&app, &order_id).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(wait_for_balance(&app, customer.id, 0).await, 0);
}

#[tokio::test]
async fn redeeming_points_issues_a_usable_coupon() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Sofia Mera", None).await;
    let product = app.seed_product("Dinner", dec!(50.00), dec!(0), 20).await;
    app.seed_earning_rule(
        "1 point per $1",
        RuleKind::PerAmountStep,
        dec!(0),
        1,
        Some(dec!(1)),
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "pos").await;
    complete_order(&app, &order_id).await;
    assert_eq!(wait_for_balance(&app, customer.id, 50).await, 50);

    // Convert 30 points into a 10% coupon.
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/loyalty/{}/redeem", customer.id),
            Some(json!({"points": 30, "reward_kind": "percentage", "value": "10"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let code = body["data"]["code"].as_str().expect("coupon code").to_string();
    assert!(code.starts_with("CPN-"));
    assert_eq!(wait_for_balance(&app, customer.id, 20).await, 20);

    // The ledger records the redemption as a negative entry.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/loyalty/{}/transactions", customer.id),
            None,
        )
        .await;
    let body = response_json(response).await;
    let transactions = body["data"]["transactions"].as_array().expect("ledger");
    assert!(transactions
        .iter()
        .any(|t| t["kind"] == "redeem" && t["points_change"].as_i64() == Some(-30)));

    // Spend the coupon on a new order: 10% off the 50.00 subtotal.
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "customer_id": customer.id,
                "channel": "pos",
                "items": [{"product_id": product.id, "quantity": 1}],
                "discount_code": code
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(decimal_field(&body["data"], "discount_amount"), dec!(5.00));
    assert_eq!(decimal_field(&body["data"], "total_amount"), dec!(45.00));
}

#[tokio::test]
async fn redeeming_over_balance_is_refused() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Elena Paz", None).await;
    let product = app.seed_product("Lunch", dec!(10.00), dec!(0), 10).await;
    app.seed_earning_rule(
        "1 point per $1",
        RuleKind::PerAmountStep,
        dec!(0),
        1,
        Some(dec!(1)),
        RuleChannel::All,
    )
    .await;

    let order_id = create_order_for(&app, customer.id, product.id, 1, "pos").await;
    complete_order(&app, &order_id).await;
    assert_eq!(wait_for_balance(&app, customer.id, 10).await, 10);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/loyalty/{}/redeem", customer.id),
            Some(json!({"points": 500, "reward_kind": "fixed_amount", "value": "5"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(wait_for_balance(&app, customer.id, 10).await, 10);
}

#[tokio::test]
async fn a_coupon_is_single_use() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Jorge Sol", None).await;
    let product = app.seed_product("Platter", dec!(20.00), dec!(0), 20).await;
    let coupon = app
        .seed_coupon(customer.id, "ONCE-ONLY", RewardKind::FixedAmount, dec!(4.00))
        .await;

    let order = json!({
        "customer_id": customer.id,
        "channel": "pos",
        "items": [{"product_id": product.id, "quantity": 1}],
        "discount_code": coupon.code
    });

    let response = app
        .request(Method::POST, "/api/v1/orders", Some(order.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(decimal_field(&body["data"], "discount_amount"), dec!(4.00));

    // Second use sees the coupon as already consumed.
    let response = app.request(Method::POST, "/api/v1/orders", Some(order)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
