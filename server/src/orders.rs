//! # Order lifecycle
//!
//! Orders are created once at checkout with a frozen snapshot of the
//! purchased items, then only ever move forward through
//! `received → preparing → out_for_delivery → delivered`. Writes to the
//! store are the source of truth; the broadcast that follows each write
//! is a best-effort notification and never rolls anything back.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Customer, Order, OrderItem, OrderStatus},
    realtime::{Broadcaster, OrderEvent},
    store::{DocumentStore, ORDERS, USERS},
};

/// Admin listing row: the order plus the owning user's name and phone.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub user_name: Option<String>,
    pub user_phone: Option<String>,
}

pub struct OrderService {
    store: Arc<dyn DocumentStore>,
    events: Broadcaster,
}

impl OrderService {
    pub fn new(store: Arc<dyn DocumentStore>, events: Broadcaster) -> Self {
        Self { store, events }
    }

    /// Validates and persists a new order, then notifies admin listeners.
    /// The human-facing code avoids leaking storage identities and gives
    /// support tickets a short reference.
    pub async fn create(
        &self,
        user_id: &str,
        customer: Customer,
        items: Vec<OrderItem>,
        total_amount: f64,
        payment_method: &str,
        payment_id: Option<String>,
    ) -> Result<Order, AppError> {
        if customer.name.trim().is_empty()
            || customer.phone.trim().is_empty()
            || customer.address.trim().is_empty()
        {
            return Err(AppError::validation("Missing customer details"));
        }
        if items.is_empty() {
            return Err(AppError::validation("No items in order"));
        }

        let order = Order {
            id: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            customer,
            items,
            total_amount,
            payment_id,
            order_id: generate_order_code(),
            payment_method: payment_method.to_string(),
            status: OrderStatus::Received,
            created_at: Utc::now(),
        };

        self.store
            .put(ORDERS, &order.id, serde_json::to_vec(&order)?)
            .await?;

        self.events.publish(OrderEvent::NewOrder {
            order: order.clone(),
        });

        Ok(order)
    }

    pub async fn get(&self, id: &str) -> Result<Order, AppError> {
        let body = self
            .store
            .get(ORDERS, id)
            .await?
            .ok_or(AppError::NotFound("Order"))?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Moves the order one step forward. Writes that skip a step or move
    /// backwards are rejected; there is no optimistic concurrency token,
    /// so two racing legal updates resolve as last-write-wins.
    pub async fn advance_status(&self, id: &str, status: OrderStatus) -> Result<Order, AppError> {
        let mut order = self.get(id).await?;

        if !order.status.can_advance_to(status) {
            return Err(AppError::InvalidTransition {
                from: order.status.to_string(),
                to: status.to_string(),
            });
        }

        order.status = status;
        self.store
            .put(ORDERS, &order.id, serde_json::to_vec(&order)?)
            .await?;

        let updated_at = Utc::now();
        self.events.publish(OrderEvent::OrderStatus {
            order_id: order.id.clone(),
            status: order.status,
            updated_at,
        });
        self.events.publish(OrderEvent::AdminOrderUpdate {
            order: order.clone(),
        });

        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Order>, AppError> {
        let mut orders = self.all_orders().await?;
        orders.retain(|o| o.user_id == user_id);
        Ok(orders)
    }

    pub async fn list_all(&self) -> Result<Vec<AdminOrder>, AppError> {
        let users = self.users_by_id().await?;

        Ok(self
            .all_orders()
            .await?
            .into_iter()
            .map(|order| {
                let user = users.get(&order.user_id);
                AdminOrder {
                    user_name: user.map(|(name, _)| name.clone()),
                    user_phone: user.map(|(_, phone)| phone.clone()),
                    order,
                }
            })
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, AppError> {
        let mut orders = Vec::new();
        for body in self.store.scan(ORDERS).await? {
            orders.push(serde_json::from_slice::<Order>(&body)?);
        }
        // Newest first.
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn users_by_id(&self) -> Result<HashMap<String, (String, String)>, AppError> {
        let mut users = HashMap::new();
        for body in self.store.scan(USERS).await? {
            let user: crate::models::User = serde_json::from_slice(&body)?;
            users.insert(user.id.clone(), (user.name, user.phone));
        }
        Ok(users)
    }
}

fn generate_order_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("ORD{}{}", Utc::now().timestamp_millis(), suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CookingRequests;
    use crate::store::MemoryStore;

    fn service() -> OrderService {
        OrderService::new(MemoryStore::new(), Broadcaster::new())
    }

    fn customer() -> Customer {
        Customer {
            name: "Asha".to_string(),
            phone: "9999900000".to_string(),
            address: "12 MG Road".to_string(),
        }
    }

    fn line(id: &str, price: f64, quantity: u32) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            name: format!("Item {id}"),
            price,
            quantity,
            selected_option: None,
            no_garlic: false,
            no_onion: true,
            custom_instructions: "extra spicy".to_string(),
            cooking_requests: CookingRequests {
                jaggery: true,
                ..Default::default()
            },
            cooking_instructions: String::new(),
        }
    }

    #[tokio::test]
    async fn create_persists_a_snapshot_of_the_items() {
        let service = service();
        let items = vec![line("m1", 520.0, 1), line("b1", 90.0, 2)];

        let order = service
            .create("user-1", customer(), items.clone(), 700.0, "COD", None)
            .await
            .unwrap();

        let fetched = service.get(&order.id).await.unwrap();
        assert_eq!(fetched.items, items);
        assert_eq!(fetched.status, OrderStatus::Received);
        assert_eq!(fetched.total_amount, 700.0);
    }

    #[tokio::test]
    async fn order_code_is_distinct_from_storage_id() {
        let service = service();
        let order = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        assert!(order.order_id.starts_with("ORD"));
        assert_ne!(order.order_id, order.id);
    }

    #[tokio::test]
    async fn missing_customer_details_are_rejected_before_persistence() {
        let service = service();
        let incomplete = Customer {
            address: String::new(),
            ..customer()
        };

        let err = service
            .create("user-1", incomplete, vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.list_for_user("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_item_lists_are_rejected() {
        let service = service();
        let err = service
            .create("user-1", customer(), vec![], 0.0, "COD", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn skipping_a_status_step_is_rejected() {
        let service = service();
        let order = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        let err = service
            .advance_status(&order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        // The rejected write must not have touched the record.
        assert_eq!(service.get(&order.id).await.unwrap().status, OrderStatus::Received);
    }

    #[tokio::test]
    async fn forward_steps_advance_one_at_a_time() {
        let service = service();
        let order = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        for status in [
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            let updated = service.advance_status(&order.id, status).await.unwrap();
            assert_eq!(updated.status, status);
        }

        let err = service
            .advance_status(&order.id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn snapshot_survives_menu_mutation() {
        // The order stores copies, so nothing to mutate through: deleting
        // the menu item afterwards must leave the order untouched.
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone(), Broadcaster::new());

        store
            .put(crate::store::MENU, "m1", b"{}".to_vec())
            .await
            .unwrap();
        let order = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        store.remove(crate::store::MENU, "m1").await.unwrap();

        let fetched = service.get(&order.id).await.unwrap();
        assert_eq!(fetched.items[0].price, 520.0);
        assert_eq!(fetched.items[0].name, "Item m1");
    }

    #[tokio::test]
    async fn user_listing_is_scoped_and_newest_first() {
        let service = service();
        let first = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = service
            .create("user-1", customer(), vec![line("b1", 90.0, 1)], 130.0, "COD", None)
            .await
            .unwrap();
        service
            .create("user-2", customer(), vec![line("d1", 250.0, 1)], 290.0, "COD", None)
            .await
            .unwrap();

        let orders = service.list_for_user("user-1").await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].id, first.id);
    }

    #[tokio::test]
    async fn admin_listing_joins_user_name_and_phone() {
        let store = MemoryStore::new();
        let service = OrderService::new(store.clone(), Broadcaster::new());

        let user = crate::models::User {
            id: "user-1".to_string(),
            name: "Asha".to_string(),
            phone: "9999900000".to_string(),
            email: String::new(),
            password_hash: "x".to_string(),
            address: String::new(),
            created_at: Utc::now(),
        };
        store
            .put(USERS, &user.id, serde_json::to_vec(&user).unwrap())
            .await
            .unwrap();

        service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        let all = service.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_name.as_deref(), Some("Asha"));
        assert_eq!(all[0].user_phone.as_deref(), Some("9999900000"));
    }

    #[tokio::test]
    async fn status_changes_reach_subscribers() {
        let broadcaster = Broadcaster::new();
        let service = OrderService::new(MemoryStore::new(), broadcaster.clone());
        let mut rx = broadcaster.subscribe();

        let order = service
            .create("user-1", customer(), vec![line("m1", 520.0, 1)], 560.0, "COD", None)
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            OrderEvent::NewOrder { order: emitted } => assert_eq!(emitted.id, order.id),
            other => panic!("unexpected event: {other:?}"),
        }

        service
            .advance_status(&order.id, OrderStatus::Preparing)
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            OrderEvent::OrderStatus { order_id, status, .. } => {
                assert_eq!(order_id, order.id);
                assert_eq!(status, OrderStatus::Preparing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await.unwrap() {
            OrderEvent::AdminOrderUpdate { order: emitted } => {
                assert_eq!(emitted.status, OrderStatus::Preparing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
