//! Wish-list admin tool.
//!
//!   wish add "title, exclude terms" ["another title" ...]
//!   wish list
//!   wish del <id>
//!
//! Uses WATCH_DB_PATH and WATCH_OWNER_ID like the service.

use anyhow::{anyhow, bail, Result};

use listing_watch::config::Settings;
use listing_watch::store::SqliteStore;
use listing_watch::wishlist::{parse_wish_lines, WishListStore};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cmd, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("usage: wish <add|list|del> [args]"))?;

    let store = SqliteStore::open(&settings.db_path).await?;
    match cmd.as_str() {
        "add" => {
            let parsed = parse_wish_lines(&rest.join("\n"), settings.owner_id);
            if parsed.is_empty() {
                bail!("nothing to add");
            }
            let added = store.add_entries(&parsed).await?;
            if added.is_empty() {
                println!("All titles were already in the list");
            } else {
                println!("Added: {}", added.join(", "));
            }
        }
        "list" => {
            let entries = store.active_entries_for(settings.owner_id).await?;
            if entries.is_empty() {
                println!("Wish list is empty");
            }
            for e in entries {
                println!("{:>5}  {e}", e.id);
            }
        }
        "del" => {
            let id: i64 = rest
                .first()
                .and_then(|s| s.trim_start_matches("/del_").parse().ok())
                .ok_or_else(|| anyhow!("usage: wish del <id>"))?;
            let Some(entry) = store.entry(id).await? else {
                bail!("no wish with id {id}");
            };
            store.delete_entry(id).await?;
            println!("Removed: {entry}");
        }
        other => bail!("unknown command {other:?}"),
    }
    Ok(())
}
