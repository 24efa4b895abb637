use std::sync::Arc;

use tracing::info;

use super::{config::Config, store::Store};

pub struct AppState {
    pub config: Config,
    pub store: Store,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let store = match config.store_backend.as_str() {
            "memory" => {
                info!("Using in-memory store; documents are not persisted");
                Store::memory()
            }
            _ => Store::redis(&config.redis_url)
                .await
                .expect("Redis misconfigured!"),
        };

        Arc::new(Self { config, store })
    }

    /// State over an explicit store handle; used by the test suite.
    pub fn with_store(store: Store) -> Arc<Self> {
        Arc::new(Self {
            config: Config::load(),
            store,
        })
    }
}
