//! End-to-end tests over the router with an in-memory store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::{build_router, state::AppState};

fn app() -> Router {
    build_router(AppState::for_tests())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn authed(method: Method, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn admin(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-admin-key", "test-admin-key");
    match body {
        Some(value) => builder.body(Body::from(value.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn register(app: &Router, phone: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Asha",
                "phone": phone,
                "password": "hunter2",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn checkout_body() -> Value {
    json!({
        "customer": {"name": "Asha", "phone": "9999900000", "address": "12 MG Road"},
        "items": [{"id": "m1", "name": "Paneer Butter Masala", "price": 520.0, "quantity": 1}],
        "totalAmount": 560.0,
        "paymentMethod": "COD",
    })
}

#[tokio::test]
async fn cod_checkout_places_and_tracks_an_order() {
    let app = app();
    let token = register(&app, "9999900001").await;

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            "/api/create-order-direct",
            &token,
            Some(checkout_body()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert!(body["orderNumber"].as_str().unwrap().starts_with("ORD"));

    let order_id = body["orderId"].as_str().unwrap().to_string();
    assert_eq!(
        body["redirectUrl"].as_str().unwrap(),
        format!("/track-order?orderId={order_id}")
    );

    // Tracking is public, no token needed.
    let (status, order) = send(
        &app,
        request(Method::GET, &format!("/api/orders/{order_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], json!("received"));
    assert_eq!(order["items"][0]["price"], json!(520.0));
    assert_eq!(order["paymentMethod"], json!("COD"));
    assert!(order["paymentId"].as_str().unwrap().starts_with("COD_"));
}

#[tokio::test]
async fn checkout_requires_a_valid_token() {
    let app = app();

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/create-order-direct", Some(checkout_body())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            "/api/create-order-direct",
            "not-a-jwt",
            Some(checkout_body()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_updates_walk_the_pipeline_and_reject_skips() {
    let app = app();
    let token = register(&app, "9999900002").await;

    let (_, body) = send(
        &app,
        authed(
            Method::POST,
            "/api/create-order-direct",
            &token,
            Some(checkout_body()),
        ),
    )
    .await;
    let order_id = body["orderId"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{order_id}/status");

    // Skipping straight to delivered is a conflict.
    let (status, _) = send(
        &app,
        request(Method::PATCH, &uri, Some(json!({"status": "delivered"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for next in ["preparing", "out_for_delivery", "delivered"] {
        let (status, updated) = send(
            &app,
            request(Method::PATCH, &uri, Some(json!({"status": next}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], json!(next));
    }
}

#[tokio::test]
async fn racing_updates_settle_on_a_legal_status() {
    let app = app();
    let token = register(&app, "9999900003").await;

    let (_, body) = send(
        &app,
        authed(
            Method::POST,
            "/api/create-order-direct",
            &token,
            Some(checkout_body()),
        ),
    )
    .await;
    let order_id = body["orderId"].as_str().unwrap().to_string();
    let uri = format!("/api/orders/{order_id}/status");

    let a = send(
        &app,
        request(Method::PATCH, &uri, Some(json!({"status": "preparing"}))),
    );
    let b = send(
        &app,
        request(
            Method::PATCH,
            &uri,
            Some(json!({"status": "out_for_delivery"})),
        ),
    );
    tokio::join!(a, b);

    let (_, order) = send(
        &app,
        request(Method::GET, &format!("/api/orders/{order_id}"), None),
    )
    .await;
    let status = order["status"].as_str().unwrap();
    assert!(status == "preparing" || status == "out_for_delivery");
}

#[tokio::test]
async fn admin_listing_is_gated_by_the_admin_key() {
    let app = app();

    let (status, _) = send(&app, request(Method::GET, "/api/admin/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, admin(Method::GET, "/api/admin/orders", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn admin_listing_includes_the_owning_user() {
    let app = app();
    let token = register(&app, "9999900004").await;

    send(
        &app,
        authed(
            Method::POST,
            "/api/create-order-direct",
            &token,
            Some(checkout_body()),
        ),
    )
    .await;

    let (_, body) = send(&app, admin(Method::GET, "/api/admin/orders", None)).await;
    assert_eq!(body[0]["userName"], json!("Asha"));
    assert_eq!(body[0]["userPhone"], json!("9999900004"));
}

#[tokio::test]
async fn mock_signature_is_accepted_when_enabled() {
    // Test config enables mock payments.
    let app = app();
    let token = register(&app, "9999900005").await;

    let (status, body) = send(
        &app,
        authed(
            Method::POST,
            "/api/verify-payment",
            &token,
            Some(json!({
                "gatewayOrderId": "order_abc",
                "gatewayPaymentId": "pay_abc",
                "gatewaySignature": "mock_signature",
                "orderDetails": {
                    "customer": {"name": "Asha", "phone": "9999900005", "address": "12 MG Road"},
                    "items": [{"id": "m1", "name": "Paneer Butter Masala", "price": 520.0, "quantity": 1}],
                    "totalAmount": 560.0,
                },
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let order_id = body["orderId"].as_str().unwrap();
    let (_, order) = send(
        &app,
        request(Method::GET, &format!("/api/orders/{order_id}"), None),
    )
    .await;
    assert_eq!(order["paymentMethod"], json!("UPI"));
    assert_eq!(order["paymentId"], json!("pay_abc"));
}

#[tokio::test]
async fn bad_signatures_are_rejected() {
    let app = app();
    let token = register(&app, "9999900006").await;

    let (status, _) = send(
        &app,
        authed(
            Method::POST,
            "/api/verify-payment",
            &token,
            Some(json!({
                "gatewayOrderId": "order_abc",
                "gatewayPaymentId": "pay_abc",
                "gatewaySignature": "deadbeef",
                "orderDetails": {
                    "customer": {"name": "Asha", "phone": "9999900006", "address": "12 MG Road"},
                    "items": [{"id": "m1", "name": "Paneer Butter Masala", "price": 520.0, "quantity": 1}],
                    "totalAmount": 560.0,
                },
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_round_trip_and_me() {
    let app = app();
    register(&app, "9999900007").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"phone": "9999900007", "password": "hunter2"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(body["user"]["passwordHash"].is_null());

    let (status, body) = send(&app, authed(Method::GET, "/api/auth/me", &token, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["phone"], json!("9999900007"));

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            Some(json!({"phone": "9999900007", "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_phone_registration_is_rejected() {
    let app = app();
    register(&app, "9999900008").await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            Some(json!({"name": "Asha", "phone": "9999900008", "password": "hunter2"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn menu_crud_over_http() {
    let app = app();

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/api/menu",
            Some(json!({
                "id": "m1",
                "name": "Paneer Butter Masala",
                "price": 520.0,
                "category": "mains",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["isAvailable"], json!(true));

    let (_, listed) = send(&app, request(Method::GET, "/api/menu", None)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            "/api/menu/m1",
            Some(json!({
                "id": "m1",
                "name": "Paneer Butter Masala",
                "price": 540.0,
                "category": "mains",
                "isAvailable": false,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], json!(540.0));

    let (status, _) = send(&app, request(Method::DELETE, "/api/menu/m1", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(&app, request(Method::GET, "/api/menu", None)).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn category_reorder_swaps_neighbours() {
    let app = app();

    let mut ids = Vec::new();
    for name in ["Starters", "Mains", "Desserts"] {
        let (_, body) = send(
            &app,
            request(Method::POST, "/api/categories", Some(json!({"name": name}))),
        )
        .await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let (status, reordered) = send(
        &app,
        request(
            Method::POST,
            "/api/categories/reorder",
            Some(json!({"id": ids[1], "direction": "up"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = reordered
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Mains", "Starters", "Desserts"]);
}

#[tokio::test]
async fn tickets_flow_from_public_create_to_admin_resolve() {
    let app = app();

    let (status, ticket) = send(
        &app,
        request(
            Method::POST,
            "/api/tickets",
            Some(json!({
                "category": "Late Delivery",
                "details": "Order is 40 minutes late",
                "orderId": "abc123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ticket["status"], json!("Open"));
    let ticket_id = ticket["id"].as_str().unwrap().to_string();

    // Listing and updating are admin-only.
    let (status, _) = send(&app, request(Method::GET, "/api/tickets", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, updated) = send(
        &app,
        admin(
            Method::PATCH,
            &format!("/api/tickets/{ticket_id}"),
            Some(json!({"status": "Resolved", "adminReply": "Refund issued"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], json!("Resolved"));
    assert_eq!(updated["adminReply"], json!("Refund issued"));
}

#[tokio::test]
async fn delivery_fee_stays_in_range() {
    let app = app();
    let (status, body) = send(&app, request(Method::POST, "/api/calculate-fee", None)).await;
    assert_eq!(status, StatusCode::OK);

    let fee = body["fee"].as_u64().unwrap();
    assert!((40..90).contains(&fee));
    assert_eq!(body["distance"], json!("3.5 km"));
}

#[tokio::test]
async fn unknown_orders_are_not_found() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/api/orders/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Order not found"));
}
