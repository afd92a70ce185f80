use crate::domain::analysis::HistoricalDecision;
use crate::storage::{keys, set_json, KvStore};

/// Decision history for `username`, newest first.
///
/// A stored value that no longer decodes is logged and read as an empty
/// history, so the next append replaces it.
pub async fn load(store: &dyn KvStore, username: &str) -> anyhow::Result<Vec<HistoricalDecision>> {
    let key = keys::trading_history(username);
    let Some(raw) = store.get(&key).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<HistoricalDecision>>(&raw) {
        Ok(records) => Ok(records),
        Err(err) => {
            tracing::warn!(
                %key,
                error = %err,
                dropped = %raw,
                "decision history unreadable; starting a new one"
            );
            Ok(Vec::new())
        }
    }
}

pub async fn append(
    store: &dyn KvStore,
    username: &str,
    record: HistoricalDecision,
) -> anyhow::Result<()> {
    let mut records = load(store, username).await?;
    records.insert(0, record);
    set_json(store, &keys::trading_history(username), &records).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fallback::fallback_bundle;
    use crate::domain::company::Company;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn record(ticker: &str, hour: u32) -> HistoricalDecision {
        let company = Company::new(ticker, format!("{ticker} Inc."), "https://example.com/l.png");
        let date = Utc.with_ymd_and_hms(2026, 5, 1, hour, 0, 0).unwrap();
        HistoricalDecision::new(fallback_bundle(&company).decision, &company, date)
    }

    #[tokio::test]
    async fn appends_newest_first() {
        let store = MemoryStore::new();
        append(&store, "ada", record("NFLX", 9)).await.unwrap();
        append(&store, "ada", record("TSLA", 10)).await.unwrap();

        let history = load(&store, "ada").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].company_ticker, "TSLA");
        assert_eq!(history[1].company_ticker, "NFLX");
        assert!(history[0].date > history[1].date);
    }

    #[tokio::test]
    async fn histories_are_per_user() {
        let store = MemoryStore::new();
        append(&store, "ada", record("NFLX", 9)).await.unwrap();
        assert!(load(&store, "grace").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_history_is_replaced_on_next_append() {
        let store = MemoryStore::new();
        store.set("trading_history_ada", "{broken").await.unwrap();
        assert!(load(&store, "ada").await.unwrap().is_empty());

        append(&store, "ada", record("NFLX", 9)).await.unwrap();
        append(&store, "ada", record("TSLA", 10)).await.unwrap();

        let history = load(&store, "ada").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].company_ticker, "TSLA");
    }
}
