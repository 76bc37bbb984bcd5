use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StoreKind};
use crate::db;
use crate::users::memory::InMemoryUserStore;
use crate::users::repo::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match (config.store, &config.database) {
            (StoreKind::Postgres, Some(database)) => {
                let pool = db::connect(database).await?;
                info!(max_connections = database.max_connections, "connected to postgres");
                Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>
            }
            (StoreKind::Postgres, None) => {
                anyhow::bail!("postgres store selected without database settings")
            }
            (StoreKind::Memory, _) => {
                info!("using in-memory user store; records are lost on restart");
                Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        Self { config, store }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreKind::Memory,
            database: None,
        });
        Self::from_parts(config, Arc::new(InMemoryUserStore::new()))
    }
}
