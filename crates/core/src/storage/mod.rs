pub mod cache;
pub mod history;
pub mod memory;
pub mod postgres;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// String key-value persistence shared by sessions, accounts, preferences, cache and history.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;

    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const USERS: &str = "users";
    pub const THEME: &str = "theme";
    pub const MODEL: &str = "ai_model";

    pub fn company_cache(ticker: &str) -> String {
        format!("company_data_{ticker}")
    }

    pub fn trading_history(username: &str) -> String {
        format!("trading_history_{username}")
    }
}

pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> anyhow::Result<Option<T>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str::<T>(&raw)
        .with_context(|| format!("stored value for key={key} does not decode"))?;
    Ok(Some(value))
}

pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KvStore,
    key: &str,
    value: &T,
) -> anyhow::Result<()> {
    let raw = serde_json::to_string(value)
        .with_context(|| format!("failed to encode value for key={key}"))?;
    store.set(key, &raw).await
}

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}
