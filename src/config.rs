use anyhow::Context;
use serde::Deserialize;

/// Which [`UserStore`](crate::users::repo::UserStore) backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE {other:?} (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    /// Present only when `store` is [`StoreKind::Postgres`].
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v.parse::<u16>().context("parse APP_PORT")?,
            None => 8080,
        };
        let store = match lookup("USER_STORE") {
            Some(v) => v.parse::<StoreKind>()?,
            None => StoreKind::Postgres,
        };

        let database = match store {
            StoreKind::Postgres => Some(DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .context("DATABASE_URL must be set when USER_STORE=postgres")?,
                max_connections: match lookup("DB_MAX_CONNECTIONS") {
                    Some(v) => v.parse::<u32>().context("parse DB_MAX_CONNECTIONS")?,
                    None => 10,
                },
            }),
            StoreKind::Memory => None,
        };

        Ok(Self {
            host,
            port,
            store,
            database,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
