//! End-to-end tests for order placement and status updates.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The API server running against it (cargo run -p tindahan-api)
//! - `API_JWT_SECRET` matching the server's
//!
//! Run with: cargo test -p tindahan-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use tindahan_core::ProductId;
use tindahan_integration_tests::TestContext;

fn order_body(product: ProductId, quantity: i32) -> Value {
    json!({
        "items": [{
            "product_id": product,
            "color": "red",
            "size": "M",
            "quantity": quantity,
            "price": 500
        }],
        "total": 500 * quantity,
        "customer_email": "buyer@example.ph",
        "shipping_address": {"first_name": "Ana", "city": "Cebu", "postal_code": "6000"},
        "payment_method": "cod"
    })
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_orders_require_bearer_token() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/orders"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .client
        .get(ctx.url("/orders"))
        .header("authorization", "Bearer not.a.token")
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("body should be JSON");
    assert_eq!(body, json!({"error": "Unauthorized"}));
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_place_order_decrements_variant_stock() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let product = ctx.seed_product(500, r#"{"red":{"M":5}}"#).await;

    let resp = ctx
        .post(&user, "/orders", &order_body(product, 2))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.expect("body should be JSON");
    let items = order["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 2);
    assert!(order["total_amount"].is_number());
    assert!(order["subtotal"].is_number());
    assert_eq!(order["total_amount"].as_f64(), Some(1000.0));
    assert_eq!(order["status"], "pending");
    assert!(
        order["order_number"]
            .as_str()
            .is_some_and(|n| n.starts_with("ORD-"))
    );

    assert_eq!(ctx.variants_of(product).await, json!({"red": {"M": 3}}));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_insufficient_stock_writes_nothing() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let plenty = ctx.seed_product(300, r#"{"red":{"M":10}}"#).await;
    let scarce = ctx.seed_product(300, r#"{"red":{"M":1}}"#).await;

    let body = json!({
        "items": [
            {"product_id": plenty, "color": "red", "size": "M", "quantity": 2},
            {"product_id": scarce, "color": "red", "size": "M", "quantity": 2}
        ],
        "total": 1200,
        "customer_email": "buyer@example.ph"
    });

    let resp = ctx
        .post(&user, "/orders", &body)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let error: Value = resp.json().await.expect("body should be JSON");
    assert_eq!(error["product_id"], json!(scarce));
    assert_eq!(error["available"], 1);
    assert_eq!(error["requested"], 2);
    assert_eq!(error["shortfall"], 1);

    assert_eq!(ctx.order_count(&user).await, 0);
    assert_eq!(ctx.variants_of(plenty).await, json!({"red": {"M": 10}}));
    assert_eq!(ctx.variants_of(scarce).await, json!({"red": {"M": 1}}));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_catalog_price_wins_over_client_price() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let product = ctx.seed_product(750, r#"{"red":{"M":5}}"#).await;

    let resp = ctx
        .post(&user, "/orders", &order_body(product, 1))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.expect("body should be JSON");
    assert_eq!(order["items"][0]["price"].as_f64(), Some(750.0));
    assert_eq!(order["total_amount"].as_f64(), Some(750.0));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_unknown_product_rejected() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;

    let resp = ctx
        .post(&user, "/orders", &order_body(ProductId::new(i32::MAX), 1))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.order_count(&user).await, 0);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_shipping_address_round_trips_verbatim() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let product = ctx.seed_product(500, r#"{"red":{"M":5}}"#).await;

    // Keys out of alphabetical order and a trailing zero must both survive.
    let address = r#"{"first_name":"Ana","city":"Cebu","postal_code":"6000","lat":10.30}"#;
    let body = format!(
        r#"{{"items":[{{"product_id":{product},"color":"red","size":"M","quantity":1,"price":500}}],"total":500,"customer_email":"buyer@example.ph","shipping_address":{address}}}"#
    );

    let resp = ctx
        .post_raw(&user, "/orders", &body)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = resp.text().await.expect("body should be text");
    assert!(
        created.contains(&format!(r#""shipping_address":{address}"#)),
        "create response changed the address: {created}"
    );

    let listed = ctx
        .get(&user, "/orders")
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body should be text");
    assert!(
        listed.contains(&format!(r#""shipping_address":{address}"#)),
        "list response changed the address: {listed}"
    );

    let created: Value = serde_json::from_str(&created).expect("body should be JSON");
    assert!(created["shipping_address"].is_object());
    let id = created["id"].as_i64().expect("order id");
    let fetched = ctx
        .get(&user, &format!("/orders?id={id}"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body should be text");
    assert!(
        fetched.contains(&format!(r#""shipping_address":{address}"#)),
        "get response changed the address: {fetched}"
    );
}

// ============================================================================
// Status Updates
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_owner_updates_status_and_tracking() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let product = ctx.seed_product(500, r#"{"red":{"M":5}}"#).await;

    let created: Value = ctx
        .post(&user, "/orders", &order_body(product, 1))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("body should be JSON");
    let id = created["id"].as_i64().expect("order id");

    let resp = ctx
        .put(
            &user,
            &format!("/orders?id={id}"),
            &json!({"status": "shipped", "tracking_number": "LBC-0001"}),
        )
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let order: Value = resp.json().await.expect("body should be JSON");
    assert_eq!(order["status"], "shipped");
    assert_eq!(order["tracking_number"], "LBC-0001");

    // Tracking number is kept when omitted
    let order: Value = ctx
        .put(&user, &format!("/orders?id={id}"), &json!({"status": "delivered"}))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("body should be JSON");
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["tracking_number"], "LBC-0001");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_non_owner_cannot_update_status() {
    let ctx = TestContext::new().await;
    let owner = ctx.seed_user().await;
    let intruder = ctx.seed_user().await;
    let product = ctx.seed_product(500, r#"{"red":{"M":5}}"#).await;

    let created: Value = ctx
        .post(&owner, "/orders", &order_body(product, 1))
        .send()
        .await
        .expect("request failed")
        .json()
        .await
        .expect("body should be JSON");
    let id = created["id"].as_i64().expect("order id");

    let resp = ctx
        .put(
            &intruder,
            &format!("/orders?id={id}"),
            &json!({"status": "cancelled"}),
        )
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let status: String = sqlx::query_scalar("SELECT status FROM shop.orders WHERE id = $1")
        .bind(i32::try_from(id).expect("id fits i32"))
        .fetch_one(&ctx.pool)
        .await
        .expect("order should exist");
    assert_eq!(status, "pending");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_client_user_id_is_ignored() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user().await;
    let other = ctx.seed_user().await;
    let product = ctx.seed_product(500, r#"{"red":{"M":5}}"#).await;

    let mut body = order_body(product, 1);
    body["user_id"] = json!(other.id);

    let resp = ctx
        .post(&user, "/orders", &body)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.expect("body should be JSON");
    assert_eq!(order["user_id"], json!(user.id));
    assert_eq!(ctx.order_count(&other).await, 0);
}
