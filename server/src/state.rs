use std::sync::Arc;

use crate::{
    config::Config,
    realtime::Broadcaster,
    store::{init_redis, DocumentStore, RedisStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub events: Broadcaster,
}

impl AppState {
    pub async fn new() -> Self {
        let config = Config::load();
        let connection = init_redis(&config.redis_url).await;

        Self {
            config: Arc::new(config),
            store: RedisStore::new(connection),
            events: Broadcaster::new(),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            config: Arc::new(Config::for_tests()),
            store: crate::store::MemoryStore::new(),
            events: Broadcaster::new(),
        }
    }
}
