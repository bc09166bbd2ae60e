// src/wishlist.rs
//! Wish-list access for the engine (read-only) plus the parsing used by the
//! management surface to create entries.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{WishId, WishListEntry};

#[async_trait]
pub trait WishListStore: Send + Sync {
    /// Entries of `owner`, in creation order.
    async fn active_entries_for(&self, owner: i64) -> Result<Vec<WishListEntry>>;
}

/// Unsaved entry parsed from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWish {
    pub owner_id: i64,
    pub title: String,
    pub exclude_terms: Option<String>,
}

/// Parse one entry per line: `title` or `title, exclude terms`.
/// Input is lower-cased; blank lines are skipped.
pub fn parse_wish_lines(text: &str, owner_id: i64) -> Vec<NewWish> {
    text.to_lowercase()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|line| {
            let (title, exclude) = match line.split_once(", ") {
                Some((t, ex)) => (t.trim(), Some(ex.trim())),
                None => (line, None),
            };
            NewWish {
                owner_id,
                title: title.to_string(),
                exclude_terms: exclude.filter(|e| !e.is_empty()).map(str::to_string),
            }
        })
        .filter(|w| !w.title.is_empty())
        .collect()
}

/// In-process store for tests.
#[derive(Debug, Default)]
pub struct MemoryWishStore {
    entries: std::sync::Mutex<Vec<WishListEntry>>,
}

impl MemoryWishStore {
    pub fn with_entries(entries: Vec<WishListEntry>) -> Self {
        Self {
            entries: std::sync::Mutex::new(entries),
        }
    }

    pub fn delete(&self, id: WishId) -> bool {
        let mut v = self.entries.lock().expect("wish store mutex poisoned");
        let before = v.len();
        v.retain(|w| w.id != id);
        v.len() != before
    }
}

#[async_trait]
impl WishListStore for MemoryWishStore {
    async fn active_entries_for(&self, owner: i64) -> Result<Vec<WishListEntry>> {
        let v = self.entries.lock().expect("wish store mutex poisoned");
        Ok(v.iter().filter(|w| w.owner_id == owner).cloned().collect())
    }
}
