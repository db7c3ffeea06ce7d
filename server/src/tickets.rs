//! Support tickets. Independent of the order lifecycle except for the
//! optional, untyped `orderId` string customers may quote.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Ticket, TicketCategory, TicketStatus},
    store::{DocumentStore, TICKETS},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    pub email: Option<String>,
    pub category: TicketCategory,
    #[serde(default)]
    pub details: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub admin_reply: Option<String>,
}

pub struct TicketRepo {
    store: Arc<dyn DocumentStore>,
}

impl TicketRepo {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewTicket) -> Result<Ticket, AppError> {
        let ticket = Ticket {
            id: Uuid::new_v4().simple().to_string(),
            user_id: new.user_id,
            order_id: new.order_id,
            email: new.email,
            category: new.category,
            details: new.details,
            admin_reply: None,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        };

        self.store
            .put(TICKETS, &ticket.id, serde_json::to_vec(&ticket)?)
            .await?;
        Ok(ticket)
    }

    pub async fn list(&self) -> Result<Vec<Ticket>, AppError> {
        let mut tickets = Vec::new();
        for body in self.store.scan(TICKETS).await? {
            tickets.push(serde_json::from_slice::<Ticket>(&body)?);
        }
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    /// Admin-side mutation: status and/or reply. Tickets are never
    /// deleted.
    pub async fn update(&self, id: &str, update: TicketUpdate) -> Result<Ticket, AppError> {
        let body = self
            .store
            .get(TICKETS, id)
            .await?
            .ok_or(AppError::NotFound("Ticket"))?;
        let mut ticket: Ticket = serde_json::from_slice(&body)?;

        if let Some(status) = update.status {
            ticket.status = status;
        }
        if let Some(reply) = update.admin_reply {
            ticket.admin_reply = Some(reply);
        }

        self.store
            .put(TICKETS, id, serde_json::to_vec(&ticket)?)
            .await?;
        Ok(ticket)
    }
}
