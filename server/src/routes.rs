//! HTTP handlers. Thin extract/validate/respond wrappers; the domain
//! logic lives in the repo and service modules.

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::{self, AdminKey, AuthUser, UserRepo},
    catalog::{CatalogRepo, CategoryUpdate, Direction},
    error::AppError,
    models::{Customer, MenuItem, Order, OrderItem, OrderStatus, PublicUser},
    orders::OrderService,
    payments,
    realtime,
    state::AppState,
    tickets::{NewTicket, TicketRepo, TicketUpdate},
};

pub async fn root_handler() -> impl IntoResponse {
    "Spice Route API is Running"
}

// ---- Menu ----

pub async fn list_menu_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItem>>, AppError> {
    let items = CatalogRepo::new(state.store.clone()).list_menu().await?;
    Ok(Json(items))
}

pub async fn create_menu_item_handler(
    State(state): State<AppState>,
    Json(item): Json<MenuItem>,
) -> Result<Json<MenuItem>, AppError> {
    let item = CatalogRepo::new(state.store.clone())
        .create_menu_item(item)
        .await?;
    Ok(Json(item))
}

pub async fn update_menu_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(item): Json<MenuItem>,
) -> Result<Json<MenuItem>, AppError> {
    let item = CatalogRepo::new(state.store.clone())
        .update_menu_item(&id, item)
        .await?;
    Ok(Json(item))
}

pub async fn delete_menu_item_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    CatalogRepo::new(state.store.clone())
        .delete_menu_item(&id)
        .await?;
    Ok(Json(json!({ "message": "Item deleted successfully" })))
}

// ---- Categories ----

#[derive(Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub id: String,
    pub direction: Direction,
}

pub async fn list_categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<crate::models::Category>>, AppError> {
    let categories = CatalogRepo::new(state.store.clone()).list_categories().await?;
    Ok(Json(categories))
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    Json(body): Json<NewCategoryRequest>,
) -> Result<Json<crate::models::Category>, AppError> {
    let category = CatalogRepo::new(state.store.clone())
        .create_category(&body.name)
        .await?;
    Ok(Json(category))
}

pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CategoryUpdate>,
) -> Result<Json<crate::models::Category>, AppError> {
    let category = CatalogRepo::new(state.store.clone())
        .update_category(&id, update)
        .await?;
    Ok(Json(category))
}

pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    CatalogRepo::new(state.store.clone())
        .delete_category(&id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn reorder_categories_handler(
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<Vec<crate::models::Category>>, AppError> {
    let categories = CatalogRepo::new(state.store.clone())
        .reorder_category(&body.id, body.direction)
        .await?;
    Ok(Json(categories))
}

// ---- Auth ----

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if body.name.trim().is_empty() || body.phone.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::validation(
            "Name, phone, and password are required",
        ));
    }

    let users = UserRepo::new(state.store.clone());
    if users.find_by_phone(&body.phone).await?.is_some() {
        return Err(AppError::validation(
            "User with this phone number already exists",
        ));
    }

    let user = users
        .create(&body.name, &body.phone, &body.email, &body.password, &body.address)
        .await?;
    let token = auth::issue_token(
        &user.id,
        &user.phone,
        &state.config.jwt_secret,
        state.config.token_ttl_days,
    )?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: PublicUser::from(&user),
    }))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if body.phone.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::validation("Phone and password are required"));
    }

    let users = UserRepo::new(state.store.clone());
    let user = users
        .find_by_phone(&body.phone)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid phone number or password"))?;

    if !auth::verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::unauthorized("Invalid phone number or password"));
    }

    let token = auth::issue_token(
        &user.id,
        &user.phone,
        &state.config.jwt_secret,
        state.config.token_ttl_days,
    )?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: PublicUser::from(&user),
    }))
}

pub async fn me_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = UserRepo::new(state.store.clone())
        .get(&auth_user.user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "success": true,
        "user": PublicUser::from(&user),
    })))
}

// ---- Orders ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderRequest {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub payment_method: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
    pub order_details: OrderDetails,
}

#[derive(Deserialize)]
pub struct CreateIntentRequest {
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

fn order_created_response(order: &Order) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Order placed successfully",
        "orderId": order.id,
        "orderNumber": order.order_id,
        "redirectUrl": format!("/track-order?orderId={}", order.id),
    }))
}

pub async fn create_order_direct_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<DirectOrderRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let payment_id = if body.payment_method == "COD" {
        Some(format!("COD_{}", Utc::now().timestamp_millis()))
    } else {
        None
    };

    let order = OrderService::new(state.store.clone(), state.events.clone())
        .create(
            &auth_user.user_id,
            body.customer,
            body.items,
            body.total_amount,
            &body.payment_method,
            payment_id,
        )
        .await?;

    Ok(order_created_response(&order))
}

pub async fn create_intent_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateIntentRequest>,
) -> Result<Json<payments::PaymentIntent>, AppError> {
    Ok(Json(payments::create_intent(
        body.amount,
        &state.config.payment_key_id,
    )))
}

pub async fn verify_payment_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(body): Json<VerifyPaymentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let authentic = payments::verify_signature(
        &body.gateway_order_id,
        &body.gateway_payment_id,
        &body.gateway_signature,
        &state.config.payment_key_secret,
        state.config.allow_mock_payments,
    )?;

    if !authentic {
        return Err(AppError::validation("Invalid Signature"));
    }

    let order = OrderService::new(state.store.clone(), state.events.clone())
        .create(
            &auth_user.user_id,
            body.order_details.customer,
            body.order_details.items,
            body.order_details.total_amount,
            "UPI",
            Some(body.gateway_payment_id),
        )
        .await?;

    Ok(order_created_response(&order))
}

pub async fn update_order_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Order>, AppError> {
    let order = OrderService::new(state.store.clone(), state.events.clone())
        .advance_status(&id, body.status)
        .await?;
    Ok(Json(order))
}

/// Public lookup by storage id: the tracking page depends on it and ids
/// are random, not guessable.
pub async fn get_order_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = OrderService::new(state.store.clone(), state.events.clone())
        .get(&id)
        .await?;
    Ok(Json(order))
}

pub async fn list_user_orders_handler(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderService::new(state.store.clone(), state.events.clone())
        .list_for_user(&auth_user.user_id)
        .await?;
    Ok(Json(orders))
}

pub async fn list_admin_orders_handler(
    State(state): State<AppState>,
    _admin: AdminKey,
) -> Result<Json<Vec<crate::orders::AdminOrder>>, AppError> {
    let orders = OrderService::new(state.store.clone(), state.events.clone())
        .list_all()
        .await?;
    Ok(Json(orders))
}

// ---- Tickets ----

pub async fn create_ticket_handler(
    State(state): State<AppState>,
    Json(body): Json<NewTicket>,
) -> Result<Json<crate::models::Ticket>, AppError> {
    let ticket = TicketRepo::new(state.store.clone()).create(body).await?;
    Ok(Json(ticket))
}

pub async fn list_tickets_handler(
    State(state): State<AppState>,
    _admin: AdminKey,
) -> Result<Json<Vec<crate::models::Ticket>>, AppError> {
    let tickets = TicketRepo::new(state.store.clone()).list().await?;
    Ok(Json(tickets))
}

pub async fn update_ticket_handler(
    State(state): State<AppState>,
    _admin: AdminKey,
    Path(id): Path<String>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<crate::models::Ticket>, AppError> {
    let ticket = TicketRepo::new(state.store.clone()).update(&id, update).await?;
    Ok(Json(ticket))
}

// ---- Misc ----

pub async fn calculate_fee_handler() -> Json<payments::DeliveryFee> {
    Json(payments::delivery_fee())
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| realtime::serve_connection(socket, state))
}
