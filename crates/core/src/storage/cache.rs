use crate::domain::analysis::AnalysisBundle;
use crate::storage::{get_json, keys, set_json, KvStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: AnalysisBundle,
    /// Unix epoch milliseconds at write time.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        age_ms < ttl_ms
    }
}

/// Cached bundle for `ticker`, if one exists and is younger than `ttl`.
pub async fn read_fresh(
    store: &dyn KvStore,
    ticker: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> anyhow::Result<Option<AnalysisBundle>> {
    let entry = get_json::<CacheEntry>(store, &keys::company_cache(ticker)).await?;
    Ok(entry
        .filter(|entry| entry.is_fresh(now, ttl))
        .map(|entry| entry.data))
}

pub async fn write(
    store: &dyn KvStore,
    ticker: &str,
    bundle: &AnalysisBundle,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let entry = CacheEntry {
        data: bundle.clone(),
        timestamp: now.timestamp_millis(),
    };
    set_json(store, &keys::company_cache(ticker), &entry).await
}
