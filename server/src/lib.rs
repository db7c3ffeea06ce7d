//! Storefront backend for a home-kitchen food business.
//!
//! One axum process serves the whole surface: the public catalog, auth,
//! checkout, order tracking, support tickets, and the admin console,
//! plus a websocket fan-out for live order updates. Documents live in
//! Redis as JSON, one hash per collection.

use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, patch, post},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod orders;
pub mod payments;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod store;
pub mod tickets;

#[cfg(test)]
mod routes_tests;

use routes::*;
use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/menu", get(list_menu_handler).post(create_menu_item_handler))
        .route(
            "/api/menu/:id",
            axum::routing::put(update_menu_item_handler).delete(delete_menu_item_handler),
        )
        .route(
            "/api/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route(
            "/api/categories/:id",
            axum::routing::put(update_category_handler).delete(delete_category_handler),
        )
        .route("/api/categories/reorder", post(reorder_categories_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/me", get(me_handler))
        .route("/api/create-order", post(create_intent_handler))
        .route("/api/verify-payment", post(verify_payment_handler))
        .route("/api/create-order-direct", post(create_order_direct_handler))
        .route("/api/orders", get(list_user_orders_handler))
        .route("/api/orders/:id", get(get_order_handler))
        .route("/api/orders/:id/status", patch(update_order_status_handler))
        .route("/api/admin/orders", get(list_admin_orders_handler))
        .route("/api/tickets", post(create_ticket_handler).get(list_tickets_handler))
        .route("/api/tickets/:id", patch(update_ticket_handler))
        .route("/api/calculate-fee", post(calculate_fee_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-admin-key"),
        ])
        .allow_origin(Any)
        .max_age(Duration::from_secs(60 * 60));

    let app = build_router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
