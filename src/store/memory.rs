// src/store/memory.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::ledger::LedgerStore;
use crate::model::{LedgerEntry, ListingRecord};

/// Ledger kept in process memory. Same semantics as the SQLite store,
/// including the `(source, external id)` uniqueness check.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<Rows>,
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: Vec<LedgerEntry>,
}

impl MemoryLedgerStore {
    pub fn entries(&self, source_id: &str) -> Vec<LedgerEntry> {
        let g = self.inner.lock().expect("ledger mutex poisoned");
        g.rows.iter().filter(|r| r.source_id == source_id).cloned().collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn existing_ids(&self, source_id: &str, ids: &HashSet<String>) -> Result<HashSet<String>> {
        let g = self.inner.lock().expect("ledger mutex poisoned");
        Ok(g.rows
            .iter()
            .filter(|r| r.source_id == source_id && ids.contains(&r.external_id))
            .map(|r| r.external_id.clone())
            .collect())
    }

    async fn insert_batch(&self, source_id: &str, listings: &[ListingRecord]) -> Result<()> {
        let mut g = self.inner.lock().expect("ledger mutex poisoned");
        let mut keys: HashSet<&str> = g
            .rows
            .iter()
            .filter(|r| r.source_id == source_id)
            .map(|r| r.external_id.as_str())
            .collect();
        for l in listings {
            if !keys.insert(l.external_id.as_str()) {
                bail!("unique violation: ({source_id}, {})", l.external_id);
            }
        }
        for l in listings {
            g.next_id += 1;
            let id = g.next_id;
            g.rows.push(LedgerEntry {
                id,
                source_id: source_id.to_string(),
                external_id: l.external_id.clone(),
                linked_wish_id: l.matched_wish,
            });
        }
        Ok(())
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let g = self.inner.lock().expect("ledger mutex poisoned");
        Ok(g.rows.iter().filter(|r| r.source_id == source_id).count() as i64)
    }

    async fn delete_oldest(&self, source_id: &str, n: i64) -> Result<u64> {
        let mut g = self.inner.lock().expect("ledger mutex poisoned");
        let mut ids: Vec<i64> = g
            .rows
            .iter()
            .filter(|r| r.source_id == source_id)
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids.truncate(n.max(0) as usize);
        let doomed: HashSet<i64> = ids.into_iter().collect();
        g.rows.retain(|r| !doomed.contains(&r.id));
        Ok(doomed.len() as u64)
    }
}
