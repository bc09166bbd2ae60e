// src/notify/log.rs
use anyhow::Result;

use super::{MatchEvent, Notifier};

/// Writes matches to the log. Used when no chat channel is configured.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_match(&self, ev: &MatchEvent) -> Result<()> {
        tracing::info!(
            target: "notify",
            source = %ev.listing.source_id,
            wish = %ev.wish.title,
            price = %ev.listing.price,
            link = %ev.listing.link,
            "match: {}",
            ev.listing.title
        );
        Ok(())
    }

    async fn send_status(&self, text: &str) -> Result<()> {
        tracing::info!(target: "notify", "status: {text}");
        Ok(())
    }
}
