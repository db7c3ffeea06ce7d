//! # Document store
//!
//! The persistence layer is a plain collection-of-documents store: each
//! collection is one Redis hash, each document one JSON value keyed by
//! its id. Handlers never see Redis; they work against the
//! [`DocumentStore`] trait, and tests swap in [`MemoryStore`].
//!
//! There are no cross-collection transactions. Every write is a single
//! field upsert, which is all the data model needs since orders carry
//! snapshots instead of references.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use thiserror::Error;
use tokio::sync::RwLock;

pub const MENU: &str = "menu";
pub const CATEGORIES: &str = "categories";
pub const ORDERS: &str = "orders";
pub const TICKETS: &str = "tickets";
pub const USERS: &str = "users";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn put(&self, collection: &str, id: &str, body: Vec<u8>) -> Result<(), StoreError>;
    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>, StoreError>;
}

pub async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).unwrap();

    client
        .get_connection_manager_with_config(config)
        .await
        .unwrap()
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Arc<Self> {
        Arc::new(Self { connection })
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut connection = self.connection.clone();
        let body: Option<Vec<u8>> = connection.hget(collection, id).await?;
        Ok(body)
    }

    async fn put(&self, collection: &str, id: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = connection.hset(collection, id, body).await?;
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let removed: i64 = connection.hdel(collection, id).await?;
        Ok(removed > 0)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut connection = self.connection.clone();
        let bodies: Vec<Vec<u8>> = connection.hvals(collection).await?;
        Ok(bodies)
    }
}

/// In-memory store with the same semantics, for tests.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, body: Vec<u8>) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), body);
        Ok(())
    }

    async fn remove(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
