// src/store/sqlite.rs
//! SQLite persistence for the ledger and the wish list.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use crate::ledger::LedgerStore;
use crate::model::{ListingRecord, WishId, WishListEntry};
use crate::wishlist::{NewWish, WishListStore};

pub struct SqliteStore {
    pool: SqlitePool,
    site_ids: Mutex<HashMap<String, i64>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .with_context(|| format!("opening {db_url}"))?;

        if newly_created {
            tracing::info!(target: "ledger", path = %db_path.display(), "initialized new database");
        } else {
            tracing::info!(target: "ledger", path = %db_path.display(), "opened existing database");
        }

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database (single connection, so all queries share it).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("opening in-memory sqlite")?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        create_schema(&pool).await?;
        Ok(Self {
            pool,
            site_ids: Mutex::new(HashMap::new()),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Id of the `sites` row named `name`, creating it on first use.
    pub async fn site_id(&self, name: &str) -> Result<i64> {
        if let Some(id) = self.cached_site_id(name) {
            return Ok(id);
        }
        sqlx::query("INSERT OR IGNORE INTO sites (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .context("insert site")?;
        let id: i64 = sqlx::query_scalar("SELECT id FROM sites WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .context("select site id")?;
        self.site_ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(name.to_string(), id);
        Ok(id)
    }

    fn cached_site_id(&self, name: &str) -> Option<i64> {
        self.site_ids
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(name)
            .copied()
    }

    /// Add wishes, skipping titles the owner already has.
    /// Returns the titles actually added.
    pub async fn add_entries(&self, wishes: &[NewWish]) -> Result<Vec<String>> {
        let mut tx = self.pool.begin().await?;
        let mut added = Vec::new();
        for w in wishes {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT id FROM wishes WHERE owner_id = ? AND title = ?")
                    .bind(w.owner_id)
                    .bind(&w.title)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_some() || added.contains(&w.title) {
                continue;
            }
            sqlx::query("INSERT INTO wishes (owner_id, title, exclude_terms) VALUES (?, ?, ?)")
                .bind(w.owner_id)
                .bind(&w.title)
                .bind(&w.exclude_terms)
                .execute(&mut *tx)
                .await
                .context("insert wish")?;
            added.push(w.title.clone());
        }
        tx.commit().await?;
        Ok(added)
    }

    pub async fn entry(&self, id: WishId) -> Result<Option<WishListEntry>> {
        let row: Option<(i64, i64, String, Option<String>)> = sqlx::query_as(
            "SELECT id, owner_id, title, exclude_terms FROM wishes WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(wish_from_row))
    }

    /// Returns false when no such entry existed.
    pub async fn delete_entry(&self, id: WishId) -> Result<bool> {
        let res = sqlx::query("DELETE FROM wishes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete wish")?;
        Ok(res.rows_affected() > 0)
    }
}

fn wish_from_row((id, owner_id, title, exclude_terms): (i64, i64, String, Option<String>)) -> WishListEntry {
    WishListEntry {
        id,
        owner_id,
        title,
        exclude_terms,
    }
}

async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wishes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            exclude_terms TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // `id` gives insertion order; eviction deletes lowest ids first.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            external_id TEXT NOT NULL,
            wish_id INTEGER,
            link TEXT,
            seen_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS processed_site_external ON processed (site_id, external_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn existing_ids(&self, source_id: &str, ids: &HashSet<String>) -> Result<HashSet<String>> {
        let site = self.site_id(source_id).await?;
        let stored: Vec<String> = sqlx::query_scalar("SELECT external_id FROM processed WHERE site_id = ?")
            .bind(site)
            .fetch_all(&self.pool)
            .await
            .context("select processed ids")?;
        Ok(stored.into_iter().filter(|id| ids.contains(id)).collect())
    }

    async fn insert_batch(&self, source_id: &str, listings: &[ListingRecord]) -> Result<()> {
        let site = self.site_id(source_id).await?;
        let mut tx = self.pool.begin().await?;
        for l in listings {
            sqlx::query("INSERT INTO processed (site_id, external_id, wish_id, link) VALUES (?, ?, ?, ?)")
                .bind(site)
                .bind(&l.external_id)
                .bind(l.matched_wish)
                .bind(&l.link)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert processed ({source_id}, {})", l.external_id))?;
        }
        tx.commit().await.context("commit processed batch")?;
        Ok(())
    }

    async fn count(&self, source_id: &str) -> Result<i64> {
        let site = self.site_id(source_id).await?;
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processed WHERE site_id = ?")
            .bind(site)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn delete_oldest(&self, source_id: &str, n: i64) -> Result<u64> {
        let site = self.site_id(source_id).await?;
        let res = sqlx::query(
            "DELETE FROM processed WHERE id IN (SELECT id FROM processed WHERE site_id = ? ORDER BY id LIMIT ?)",
        )
        .bind(site)
        .bind(n)
        .execute(&self.pool)
        .await
        .context("delete oldest processed")?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl WishListStore for SqliteStore {
    async fn active_entries_for(&self, owner: i64) -> Result<Vec<WishListEntry>> {
        let rows: Vec<(i64, i64, String, Option<String>)> = sqlx::query_as(
            "SELECT id, owner_id, title, exclude_terms FROM wishes WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("select wishes")?;
        Ok(rows.into_iter().map(wish_from_row).collect())
    }
}
