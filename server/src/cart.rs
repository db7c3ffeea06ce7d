//! # Cart state
//!
//! Client-local cart logic: the server never sees a cart until checkout
//! posts a snapshot of it. One line per menu-item id; adding an item
//! that is already present bumps the quantity and layers the incoming
//! non-empty fields over what was stored, so picking a different price
//! option mutates the existing line instead of adding a second one.
//!
//! Persisted as a JSON file between runs, standing in for the browser's
//! persisted store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{CookingRequests, OrderItem},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    /// Option-resolved price, not the menu base price.
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

/// An "add to cart" request. Absent preference fields mean "keep what
/// the cart already has".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub selected_option: Option<String>,
    pub no_garlic: Option<bool>,
    pub no_onion: Option<bool>,
    pub custom_instructions: Option<String>,
    pub cooking_requests: Option<CookingRequests>,
    pub cooking_instructions: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, product: CartProduct) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == product.id) {
            item.quantity += 1;
            item.price = product.price;
            item.selected_option = product.selected_option;

            // Incoming cooking requests win only when at least one flag
            // is set, otherwise the stored ones survive.
            if let Some(requests) = product.cooking_requests {
                if requests.any() {
                    item.cooking_requests = requests;
                }
            }
            if let Some(instructions) = product.cooking_instructions {
                if !instructions.is_empty() {
                    item.cooking_instructions = instructions;
                }
            }
            if let Some(no_garlic) = product.no_garlic {
                item.no_garlic = no_garlic;
            }
            if let Some(no_onion) = product.no_onion {
                item.no_onion = no_onion;
            }
            if let Some(instructions) = product.custom_instructions {
                if !instructions.is_empty() {
                    item.custom_instructions = instructions;
                }
            }
            return;
        }

        self.items.push(CartItem {
            id: product.id,
            name: product.name,
            price: product.price,
            quantity: 1,
            selected_option: product.selected_option,
            no_garlic: product.no_garlic.unwrap_or(false),
            no_onion: product.no_onion.unwrap_or(false),
            custom_instructions: product.custom_instructions.unwrap_or_default(),
            cooking_requests: product.cooking_requests.unwrap_or_default(),
            cooking_instructions: product.cooking_instructions.unwrap_or_default(),
        });
    }

    /// Zero and negative quantities both remove the line.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = quantity as u32;
        }
    }

    pub fn update_item_option(&mut self, id: &str, selected_option: &str, price: f64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.selected_option = Some(selected_option.to_string());
            item.price = price;
        }
    }

    pub fn update_cooking_requests(&mut self, id: &str, requests: CookingRequests) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.cooking_requests = requests;
        }
    }

    pub fn update_cooking_instructions(&mut self, id: &str, instructions: &str) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.cooking_instructions = instructions.to_string();
        }
    }

    pub fn remove_item(&mut self, id: &str) {
        self.items.retain(|i| i.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Item total only; the delivery fee is added separately at checkout.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.price * f64::from(i.quantity))
            .sum()
    }

    pub fn to_order_items(&self) -> Vec<OrderItem> {
        self.items
            .iter()
            .map(|i| OrderItem {
                id: i.id.clone(),
                name: i.name.clone(),
                price: i.price,
                quantity: i.quantity,
                selected_option: i.selected_option.clone(),
                no_garlic: i.no_garlic,
                no_onion: i.no_onion,
                custom_instructions: i.custom_instructions.clone(),
                cooking_requests: i.cooking_requests.clone(),
                cooking_instructions: i.cooking_instructions.clone(),
            })
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(AppError::Internal(Box::new(e))),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, serde_json::to_vec(self)?).map_err(|e| AppError::Internal(Box::new(e)))
    }
}
