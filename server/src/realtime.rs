//! # Status broadcaster
//!
//! Fan-out of order lifecycle events to live WebSocket connections.
//! This is a notification hint, not a durable stream: delivery is
//! at-most-once, there is no replay, and a client connecting after an
//! event was emitted must re-fetch current state.
//!
//! Connections join rooms keyed by an order's storage id to follow one
//! order. `new_order` and `admin_order_update` are only delivered to
//! connections that authenticated on the admin channel with the
//! configured admin key.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::{
    models::{Order, OrderStatus},
    state::AppState,
};

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    #[serde(rename_all = "camelCase")]
    NewOrder { order: Order },
    #[serde(rename_all = "camelCase")]
    OrderStatus {
        order_id: String,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AdminOrderUpdate { order: Order },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinOrder { order_id: String },
    #[serde(rename_all = "camelCase")]
    JoinAdmin { key: String },
}

#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Fire-and-forget: an emit with no listeners is not an error, and a
    /// failed emit never rolls back the persisted write that caused it.
    pub fn publish(&self, event: OrderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }
}

struct Subscription {
    rooms: HashSet<String>,
    is_admin: bool,
}

impl Subscription {
    fn new() -> Self {
        Self {
            rooms: HashSet::new(),
            is_admin: false,
        }
    }

    fn wants(&self, event: &OrderEvent) -> bool {
        match event {
            OrderEvent::NewOrder { .. } | OrderEvent::AdminOrderUpdate { .. } => self.is_admin,
            OrderEvent::OrderStatus { order_id, .. } => self.rooms.contains(order_id),
        }
    }

    fn apply(&mut self, message: ClientMessage, admin_key: &str) {
        match message {
            ClientMessage::JoinOrder { order_id } => {
                // No ownership check: anyone holding the storage id may
                // follow the order, same as the public lookup endpoint.
                debug!("connection joined order room {order_id}");
                self.rooms.insert(order_id);
            }
            ClientMessage::JoinAdmin { key } => {
                self.is_admin = !key.is_empty() && key == admin_key;
                if !self.is_admin {
                    debug!("admin channel join rejected");
                }
            }
        }
    }
}

pub async fn serve_connection(socket: WebSocket, state: AppState) {
    let mut events = state.events.subscribe();
    let (mut sink, mut stream) = socket.split();
    let mut subscription = Subscription::new();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(message) = serde_json::from_str::<ClientMessage>(&text) {
                            subscription.apply(message, &state.config.admin_key);
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) if subscription.wants(&event) => {
                        let Ok(text) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    // Missed events are dropped, the client re-fetches.
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}
