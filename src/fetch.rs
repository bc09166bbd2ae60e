// src/fetch.rs
//! External page access: the listing-page renderer and the detail-page
//! fetcher used for full-text enrichment.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Turns a URL into the serialized page source. The tree is built by the
/// extractor so that no parsed document is held across an await point.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Body of a detail page and whether the response was a success.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub ok: bool,
    pub body: String,
}

#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<FetchedPage>;
}

/// Plain HTTP renderer/fetcher. Good enough for server-rendered catalogues.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building http client")?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Renderer for HttpClient {
    async fn render(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} non-2xx"))?;
        resp.text().await.context("reading page body")
    }
}

#[async_trait]
impl DetailFetcher for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<FetchedPage> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let ok = resp.status().is_success();
        let body = resp.text().await.context("reading detail body")?;
        Ok(FetchedPage { ok, body })
    }
}
