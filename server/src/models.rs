//! Domain documents and wire types.
//!
//! Field names on the wire stay camelCase to match the JSON API the web
//! client already speaks. Orders carry frozen copies of the purchased
//! items rather than references, so later menu edits never rewrite
//! history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceOption {
    pub label: String,
    #[serde(default)]
    pub unit: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default = "default_true")]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub sales_count: u64,
    #[serde(default)]
    pub price_options: Vec<PriceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_info: Option<Value>,
}

impl MenuItem {
    /// Price shown in listings: the cheapest option when options exist,
    /// otherwise the base price.
    pub fn display_price(&self) -> f64 {
        if self.price_options.is_empty() {
            return self.price;
        }
        self.price_options
            .iter()
            .map(|o| o.price)
            .fold(f64::INFINITY, f64::min)
    }

    /// The cart resolves the current price by option label, never by
    /// re-deriving from the item id.
    pub fn resolve_price(&self, label: &str) -> Option<f64> {
        self.price_options
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub display_order: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Preparing,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// The single legal forward step, if any. `Delivered` is terminal.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Received => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    pub fn can_advance_to(&self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CookingRequests {
    #[serde(default)]
    pub sugar: bool,
    #[serde(default)]
    pub jaggery: bool,
    #[serde(default)]
    pub dates: bool,
}

impl CookingRequests {
    pub fn any(&self) -> bool {
        self.sugar || self.jaggery || self.dates
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(default)]
    pub no_garlic: bool,
    #[serde(default)]
    pub no_onion: bool,
    #[serde(default)]
    pub custom_instructions: String,
    #[serde(default)]
    pub cooking_requests: CookingRequests,
    #[serde(default)]
    pub cooking_instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub customer: Customer,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Human-facing order code, distinct from the storage id.
    pub order_id: String,
    pub payment_method: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketCategory {
    #[serde(rename = "Late Delivery")]
    LateDelivery,
    #[serde(rename = "Missing Item")]
    MissingItem,
    #[serde(rename = "Quality Issue")]
    QualityIssue,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Soft reference only, no integrity check against orders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub category: TicketCategory,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply: Option<String>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// User shape returned to clients, password hash stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
        }
    }
}
