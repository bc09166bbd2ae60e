// src/config.rs
//! Process settings from the environment and site descriptors from TOML.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{FieldDescriptor, SiteDescriptor};
use crate::sites::{build_adapter, AdapterKind, SiteAdapter};

const ENV_SOURCES_PATH: &str = "WATCH_SOURCES_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub interval_secs: u64,
    pub source_timeout_secs: u64,
    pub owner_id: i64,
    pub http_addr: String,
    pub telegram_token: Option<String>,
    pub chat_ids: Vec<i64>,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/listing_watch.db"),
            interval_secs: 60,
            source_timeout_secs: 90,
            owner_id: 1,
            http_addr: "0.0.0.0:8080".to_string(),
            telegram_token: None,
            chat_ids: Vec::new(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Read `WATCH_*` variables. Unparsable numbers keep their defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            db_path: env_str("WATCH_DB_PATH").map(PathBuf::from).unwrap_or(d.db_path),
            interval_secs: env_parse("WATCH_INTERVAL_SECS").unwrap_or(d.interval_secs).max(1),
            source_timeout_secs: env_parse("WATCH_SOURCE_TIMEOUT_SECS")
                .unwrap_or(d.source_timeout_secs)
                .max(1),
            owner_id: env_parse("WATCH_OWNER_ID").unwrap_or(d.owner_id),
            http_addr: env_str("WATCH_HTTP_ADDR").unwrap_or(d.http_addr),
            telegram_token: env_str("WATCH_TELEGRAM_TOKEN"),
            chat_ids: env_str("WATCH_CHAT_IDS")
                .map(|v| parse_chat_ids(&v))
                .unwrap_or_default(),
            log_json: env_str("WATCH_LOG_JSON")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|v| v.parse().ok())
}

/// Space-separated chat ids; junk tokens are dropped.
pub fn parse_chat_ids(s: &str) -> Vec<i64> {
    s.split_whitespace().filter_map(|t| t.parse().ok()).collect()
}

/// One `[[source]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub adapter: AdapterKind,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(flatten)]
    pub descriptor: SiteDescriptor,
}

fn enabled_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    source: Vec<SourceConfig>,
}

pub fn parse_sources(s: &str) -> Result<Vec<SourceConfig>> {
    let file: SourcesFile = toml::from_str(s).context("parsing sources toml")?;
    let mut seen = std::collections::HashSet::new();
    for src in &file.source {
        if !seen.insert(src.name.as_str()) {
            return Err(anyhow!("duplicate source name {:?}", src.name));
        }
    }
    Ok(file.source)
}

pub fn load_sources_from(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    parse_sources(&content)
}

/// Load sources using env var + fallbacks:
/// 1) $WATCH_SOURCES_PATH
/// 2) config/sources.toml
/// 3) the built-in set
pub fn load_sources_default() -> Result<Vec<SourceConfig>> {
    if let Some(p) = env_str(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_SOURCES_PATH);
    if default.exists() {
        return load_sources_from(&default);
    }
    tracing::info!("no sources file, using built-in sources");
    Ok(builtin_sources())
}

/// Adapters for the enabled sources, in file order.
pub fn build_adapters(sources: Vec<SourceConfig>) -> Vec<Box<dyn SiteAdapter>> {
    sources
        .into_iter()
        .filter(|s| s.enabled)
        .map(|s| build_adapter(s.adapter, &s.name, s.descriptor))
        .collect()
}

pub fn builtin_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "OLX".into(),
            adapter: AdapterKind::Olx,
            enabled: true,
            descriptor: SiteDescriptor {
                primary_url: "https://www.olx.ua/uk/hobbi-otdyh-i-sport/knigi-zhurnaly/?search%5Border%5D=created_at:desc".into(),
                secondary_url: Some(
                    "https://www.olx.ua/uk/hobbi-otdyh-i-sport/knigi-zhurnaly/?page=2&search%5Border%5D=created_at:desc".into(),
                ),
                group: FieldDescriptor::class("css-1sw7q4x"),
                id_field: None,
                link_field: FieldDescriptor::tag("a").attr("href"),
                image_field: FieldDescriptor::tag("img").attr("src"),
                title_field: FieldDescriptor::tag("h6"),
                price_field: FieldDescriptor::class("css-10b0gli"),
                full_text_field: None,
                author_field: None,
                link_prefix: "https://www.olx.ua".into(),
            },
        },
        SourceConfig {
            name: "Shafa".into(),
            adapter: AdapterKind::Shafa,
            enabled: true,
            descriptor: SiteDescriptor {
                primary_url: "https://shafa.ua/uk/home/knigi?sort=4".into(),
                secondary_url: None,
                group: FieldDescriptor::class("b-catalog__item"),
                id_field: None,
                link_field: FieldDescriptor::tag("a").attr("href"),
                image_field: FieldDescriptor::tag("img").attr("data-src"),
                title_field: FieldDescriptor::class("b-tile-item__title"),
                price_field: FieldDescriptor::class("b-tile-item__price"),
                full_text_field: Some(FieldDescriptor::class("b-product-description")),
                author_field: None,
                link_prefix: "https://shafa.ua".into(),
            },
        },
        SourceConfig {
            name: "Liberby".into(),
            adapter: AdapterKind::Liberby,
            enabled: true,
            descriptor: SiteDescriptor {
                primary_url: "https://liberby.com/books?sort=new".into(),
                secondary_url: None,
                group: FieldDescriptor::class("book-card"),
                id_field: None,
                link_field: FieldDescriptor::tag("a").attr("href"),
                image_field: FieldDescriptor::tag("img").attr("src"),
                title_field: FieldDescriptor::class("book-card__title"),
                price_field: FieldDescriptor::class("book-card__price"),
                full_text_field: None,
                author_field: Some(FieldDescriptor::class("book-card__author")),
                link_prefix: "https://liberby.com".into(),
            },
        },
        SourceConfig {
            name: "Izi".into(),
            adapter: AdapterKind::Izi,
            enabled: true,
            descriptor: SiteDescriptor {
                primary_url: "https://izi.ua/c-2185-knigi?order=new".into(),
                secondary_url: Some("https://izi.ua/c-2185-knigi?order=new&page=2".into()),
                group: FieldDescriptor::tag("main"),
                id_field: None,
                link_field: FieldDescriptor::tag("a").attr("href"),
                image_field: FieldDescriptor::tag("img").attr("src"),
                title_field: FieldDescriptor::class("ek-text_weight_medium"),
                price_field: FieldDescriptor::class("ek-text_weight_bold"),
                full_text_field: None,
                author_field: None,
                link_prefix: "https://izi.ua".into(),
            },
        },
    ]
}
