//! Manual smoke run against a live server: registers a throwaway user,
//! fills a cart from the live menu, checks out with COD, then walks the
//! order through the status pipeline with the admin key.

use std::path::PathBuf;

use clap::Parser;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use server::cart::{Cart, CartProduct};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the running server.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Admin key for console endpoints.
    #[arg(long, default_value = "dev-admin-key")]
    admin_key: String,

    /// Cart file carried between runs.
    #[arg(long, default_value = "cart.json")]
    cart_file: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let client = Client::new();

    let phone = format!("99999{:05}", rand::thread_rng().gen_range(0..100_000));
    println!("Registering user with phone {phone}");

    let auth: Value = client
        .post(format!("{}/api/auth/register", args.base_url))
        .json(&json!({
            "name": "Smoke Tester",
            "phone": phone,
            "password": "hunter2",
            "address": "12 MG Road",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = auth["token"].as_str().unwrap().to_string();

    let menu: Vec<Value> = client
        .get(format!("{}/api/menu", args.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    println!("Menu has {} items", menu.len());

    let mut cart = Cart::load(&args.cart_file).unwrap();
    for item in menu.iter().take(2) {
        cart.add_item(CartProduct {
            id: item["id"].as_str().unwrap().to_string(),
            name: item["name"].as_str().unwrap().to_string(),
            price: item["price"].as_f64().unwrap(),
            ..Default::default()
        });
    }
    cart.save(&args.cart_file).unwrap();

    if cart.items.is_empty() {
        println!("Empty menu and empty cart, nothing to order. Exiting.");
        return;
    }

    let fee: Value = client
        .post(format!("{}/api/calculate-fee", args.base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let total = cart.total() + fee["fee"].as_f64().unwrap();
    println!("Cart total {} + fee {} = {total}", cart.total(), fee["fee"]);

    let placed: Value = client
        .post(format!("{}/api/create-order-direct", args.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "customer": {"name": "Smoke Tester", "phone": phone, "address": "12 MG Road"},
            "items": cart.to_order_items(),
            "totalAmount": total,
            "paymentMethod": "COD",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = placed["orderId"].as_str().unwrap().to_string();
    println!(
        "Placed order {} ({})",
        placed["orderNumber"], order_id
    );

    cart.clear();
    cart.save(&args.cart_file).unwrap();

    for status in ["preparing", "out_for_delivery", "delivered"] {
        let response = client
            .patch(format!("{}/api/orders/{order_id}/status", args.base_url))
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        println!("Advance to {status}: {}", response.status());
    }

    let tracked: Value = client
        .get(format!("{}/api/orders/{order_id}", args.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    println!("Final status: {}", tracked["status"]);

    let admin_orders: Vec<Value> = client
        .get(format!("{}/api/admin/orders", args.base_url))
        .header("x-admin-key", &args.admin_key)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    println!("Admin console sees {} orders", admin_orders.len());
}
