// src/notify/mod.rs
//! Delivery of matches and source health. The engine only hands over typed
//! events; formatting belongs to the notifiers.

pub mod log;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::Settings;
use crate::model::{ListingRecord, WishListEntry};

/// A new listing and the wish it matched.
#[derive(Debug, Clone, Serialize)]
pub struct MatchEvent {
    pub listing: ListingRecord,
    pub wish: WishListEntry,
}

#[async_trait]
pub trait EmissionSink: Send + Sync {
    async fn emit(&self, ev: &MatchEvent) -> Result<()>;
}

#[async_trait]
pub trait HealthSink: Send + Sync {
    /// Called once per cycle with the sources that produced no listings.
    async fn report(&self, not_working: &[String]) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send_match(&self, ev: &MatchEvent) -> Result<()>;
    async fn send_status(&self, text: &str) -> Result<()>;
}

/// Status line for a health report.
pub fn status_text(not_working: &[String]) -> String {
    if not_working.is_empty() {
        "OK".to_string()
    } else {
        format!("Not works {}", not_working.join(", "))
    }
}

/// Fans every event out to all configured notifiers. One notifier failing
/// does not stop the others.
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Telegram when a token and chats are configured, the log otherwise.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        match (&settings.telegram_token, settings.chat_ids.is_empty()) {
            (Some(token), false) => {
                notifiers.push(Box::new(telegram::TelegramNotifier::new(
                    token.clone(),
                    settings.chat_ids.clone(),
                )?));
            }
            _ => {
                tracing::info!(target: "notify", "telegram disabled (no WATCH_TELEGRAM_TOKEN / WATCH_CHAT_IDS)");
                notifiers.push(Box::new(log::LogNotifier));
            }
        }
        Ok(Self::new(notifiers))
    }
}

#[async_trait]
impl EmissionSink for NotifierMux {
    async fn emit(&self, ev: &MatchEvent) -> Result<()> {
        for n in &self.notifiers {
            if let Err(e) = n.send_match(ev).await {
                tracing::warn!(target: "notify", notifier = n.name(), error = %e, "match delivery failed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HealthSink for NotifierMux {
    async fn report(&self, not_working: &[String]) -> Result<()> {
        let text = status_text(not_working);
        if !not_working.is_empty() {
            tracing::error!(target: "notify", "{text}");
        }
        for n in &self.notifiers {
            if let Err(e) = n.send_status(&text).await {
                tracing::warn!(target: "notify", notifier = n.name(), error = %e, "status delivery failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<String>>>);

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }
        async fn send_match(&self, ev: &MatchEvent) -> Result<()> {
            self.0.lock().unwrap().push(ev.listing.title.clone());
            Ok(())
        }
        async fn send_status(&self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn send_match(&self, _ev: &MatchEvent) -> Result<()> {
            anyhow::bail!("down")
        }
        async fn send_status(&self, _text: &str) -> Result<()> {
            anyhow::bail!("down")
        }
    }

    #[test]
    fn status_lists_broken_sources() {
        assert_eq!(status_text(&[]), "OK");
        assert_eq!(status_text(&["OLX".into(), "Shafa".into()]), "Not works OLX, Shafa");
    }

    #[tokio::test]
    async fn failing_notifier_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mux = NotifierMux::new(vec![Box::new(Broken), Box::new(Recorder(log.clone()))]);
        mux.report(&["OLX".to_string()]).await.unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["Not works OLX".to_string()]);
    }
}
