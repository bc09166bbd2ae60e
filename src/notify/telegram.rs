// src/notify/telegram.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{MatchEvent, Notifier};

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    token: String,
    chat_ids: Vec<i64>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
    /// Last status message, replaced on every health report.
    last_status: Mutex<Option<(i64, i64)>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    /// A `Message` for sends, `true` for deletes.
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_ids: Vec<i64>) -> Result<Self> {
        if chat_ids.is_empty() {
            return Err(anyhow!("telegram notifier needs at least one chat id"));
        }
        Ok(Self {
            token,
            chat_ids,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            last_status: Mutex::new(None),
        })
    }

    async fn call(&self, method: &str, body: &serde_json::Value) -> Result<Option<i64>> {
        let url = format!("{API_BASE}/bot{}/{method}", self.token);
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(body)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => {
                    let parsed: ApiResponse = rsp.json().await.context("telegram response body")?;
                    if parsed.ok {
                        return Ok(parsed
                            .result
                            .as_ref()
                            .and_then(|r| r.get("message_id"))
                            .and_then(|id| id.as_i64()));
                    }
                    anyhow!(
                        "telegram {method} rejected: {}",
                        parsed.description.unwrap_or_default()
                    )
                }
                Err(e) => anyhow!("telegram {method} request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
}

/// `price | title`, link, and the wish that matched, HTML-escaped.
pub fn caption(ev: &MatchEvent) -> String {
    let esc = |s: &str| html_escape::encode_text(s).to_string();
    format!(
        "{} | {}\n{}\nSearching: {}\nRemove from search: /del_{}",
        esc(&ev.listing.price),
        esc(&ev.listing.title),
        esc(&ev.listing.link),
        esc(&ev.wish.title),
        ev.wish.id
    )
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send_match(&self, ev: &MatchEvent) -> Result<()> {
        let text = caption(ev);
        for chat in &self.chat_ids {
            let photo = json!({
                "chat_id": chat,
                "photo": ev.listing.image,
                "caption": text,
                "parse_mode": "HTML",
            });
            if let Err(e) = self.call("sendPhoto", &photo).await {
                tracing::warn!(target: "notify", chat, error = %e, "cannot send image, falling back to text");
                let msg = json!({
                    "chat_id": chat,
                    "text": text,
                    "parse_mode": "HTML",
                });
                self.call("sendMessage", &msg).await?;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }

    /// Status goes to the first chat only and replaces the previous one.
    async fn send_status(&self, text: &str) -> Result<()> {
        let chat = self.chat_ids[0];
        let mut last = self.last_status.lock().await;
        if let Some((prev_chat, prev_id)) = last.take() {
            let del = json!({ "chat_id": prev_chat, "message_id": prev_id });
            if let Err(e) = self.call("deleteMessage", &del).await {
                tracing::debug!(target: "notify", error = %e, "previous status not deleted");
            }
        }
        let msg = json!({ "chat_id": chat, "text": text });
        let id = self.call("sendMessage", &msg).await?;
        *last = id.map(|id| (chat, id));
        Ok(())
    }
}
