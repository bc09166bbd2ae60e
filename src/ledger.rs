// src/ledger.rs
//! Dedup ledger: the durable record of every listing id already seen per
//! source, with bounded retention.
//!
//! A cycle opens a `LedgerSession` for its source. The session holds the
//! source's partition lock, so the `already_seen` read and the `record_seen`
//! write of one cycle cannot interleave with another cycle of the same source.

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::ListingRecord;

/// Eviction kicks in once a source holds more entries than this.
pub const EVICT_ABOVE: i64 = 2000;
/// Eviction trims a source down to this many entries.
pub const EVICT_DOWN_TO: i64 = 1500;

/// Persistence behind the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Subset of `ids` already recorded for `source_id`.
    async fn existing_ids(&self, source_id: &str, ids: &HashSet<String>) -> Result<HashSet<String>>;
    /// Insert one entry per listing. All or nothing.
    async fn insert_batch(&self, source_id: &str, listings: &[ListingRecord]) -> Result<()>;
    async fn count(&self, source_id: &str) -> Result<i64>;
    /// Delete the `n` oldest entries (lowest surrogate id) of `source_id`.
    async fn delete_oldest(&self, source_id: &str, n: i64) -> Result<u64>;
}

pub struct DedupLedger {
    store: Arc<dyn LedgerStore>,
    partitions: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DedupLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            partitions: Mutex::new(HashMap::new()),
        }
    }

    fn partition(&self, source_id: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.partitions.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(source_id.to_string()).or_default().clone()
    }

    /// Open the unit of work for one cycle page of `source_id`.
    pub async fn session(&self, source_id: &str) -> LedgerSession<'_> {
        let guard = self.partition(source_id).lock_owned().await;
        LedgerSession {
            ledger: self,
            source_id: source_id.to_string(),
            _guard: guard,
        }
    }

    /// Trim `source_id` back to `EVICT_DOWN_TO` entries if it grew past
    /// `EVICT_ABOVE`. Returns how many entries were deleted.
    pub async fn evict(&self, source_id: &str) -> Result<u64> {
        let count = self.store.count(source_id).await?;
        if count <= EVICT_ABOVE {
            return Ok(0);
        }
        let deleted = self.store.delete_oldest(source_id, count - EVICT_DOWN_TO).await?;
        tracing::info!(target: "ledger", source = source_id, before = count, deleted, "ledger evicted");
        counter!("watch_ledger_evictions_total", "source" => source_id.to_string()).increment(deleted);
        Ok(deleted)
    }
}

pub struct LedgerSession<'a> {
    ledger: &'a DedupLedger,
    source_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl LedgerSession<'_> {
    /// Ids from `ids` that the ledger already holds for this source.
    pub async fn already_seen(&self, ids: &HashSet<String>) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        self.ledger.store.existing_ids(&self.source_id, ids).await
    }

    /// Record `listings` as seen, then run eviction.
    ///
    /// Duplicate ids inside the batch are recorded once. A failed write is
    /// returned to the caller; a failed eviction is only logged.
    pub async fn record_seen(&self, listings: &[ListingRecord]) -> Result<usize> {
        let mut ids = HashSet::new();
        let batch: Vec<ListingRecord> = listings
            .iter()
            .filter(|l| ids.insert(l.external_id.clone()))
            .cloned()
            .collect();
        if batch.is_empty() {
            return Ok(0);
        }

        self.ledger.store.insert_batch(&self.source_id, &batch).await?;
        tracing::debug!(target: "ledger", source = %self.source_id, count = batch.len(), "recorded seen listings");

        if let Err(e) = self.ledger.evict(&self.source_id).await {
            tracing::warn!(target: "ledger", source = %self.source_id, error = %e, "ledger eviction failed");
        }
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLedgerStore;

    fn rec(id: &str) -> ListingRecord {
        ListingRecord {
            source_id: "shop".into(),
            external_id: id.into(),
            link: format!("https://shop.test/{id}"),
            image: String::new(),
            title: "t".into(),
            price: "p".into(),
            full_text: None,
            matched_wish: None,
        }
    }

    #[tokio::test]
    async fn batch_duplicates_are_recorded_once() {
        let store = Arc::new(MemoryLedgerStore::default());
        let ledger = DedupLedger::new(store.clone());
        let s = ledger.session("shop").await;
        let n = s.record_seen(&[rec("1"), rec("1"), rec("2")]).await.unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.count("shop").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn eviction_trims_to_lower_bound_oldest_first() {
        let store = Arc::new(MemoryLedgerStore::default());
        let ledger = DedupLedger::new(store.clone());
        let batch: Vec<_> = (0..EVICT_ABOVE).map(|i| rec(&i.to_string())).collect();
        ledger.session("shop").await.record_seen(&batch).await.unwrap();
        assert_eq!(store.count("shop").await.unwrap(), EVICT_ABOVE);

        ledger.session("shop").await.record_seen(&[rec("new")]).await.unwrap();
        assert_eq!(store.count("shop").await.unwrap(), EVICT_DOWN_TO);

        let probe: HashSet<String> = ["0", "500", "501", "new"].iter().map(|s| s.to_string()).collect();
        let seen = ledger.session("shop").await.already_seen(&probe).await.unwrap();
        assert!(!seen.contains("0"));
        assert!(!seen.contains("500"));
        assert!(seen.contains("501"));
        assert!(seen.contains("new"));
    }

    #[tokio::test]
    async fn partitions_are_per_source() {
        let store = Arc::new(MemoryLedgerStore::default());
        let ledger = DedupLedger::new(store);
        let a = ledger.session("a").await;
        // A second source must not wait on the first one's lock.
        let b = tokio::time::timeout(std::time::Duration::from_millis(100), ledger.session("b")).await;
        assert!(b.is_ok());
        drop(a);
    }
}
