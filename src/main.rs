//! listing-watch service entrypoint.
//! Opens the ledger, starts the source scheduler and serves `/health` and
//! `/metrics`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listing_watch::api::{create_router, AppState};
use listing_watch::config::{build_adapters, load_sources_default, Settings};
use listing_watch::fetch::HttpClient;
use listing_watch::health::HealthBoard;
use listing_watch::ledger::DedupLedger;
use listing_watch::metrics::Metrics;
use listing_watch::notify::NotifierMux;
use listing_watch::orchestrator::SourceOrchestrator;
use listing_watch::scheduler::{Scheduler, SchedulerCfg};
use listing_watch::sites::SiteAdapter;
use listing_watch::store::SqliteStore;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_watch=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();
    init_tracing(settings.log_json);

    let metrics = Metrics::init()?;

    let sources = load_sources_default()?;
    let adapters: Vec<Arc<dyn SiteAdapter>> = build_adapters(sources)
        .into_iter()
        .map(Arc::from)
        .collect();
    tracing::info!(sources = adapters.len(), "sources loaded");

    let store = Arc::new(SqliteStore::open(&settings.db_path).await?);
    let ledger = Arc::new(DedupLedger::new(store.clone()));
    let http = Arc::new(HttpClient::new(settings.source_timeout_secs)?);
    let orchestrator = SourceOrchestrator::new(http.clone(), http, ledger);

    let notifier = Arc::new(NotifierMux::from_settings(&settings)?);
    let board = Arc::new(HealthBoard::new());

    let cfg = SchedulerCfg {
        interval_secs: settings.interval_secs,
        source_timeout_secs: settings.source_timeout_secs,
        owner_id: settings.owner_id,
        ..SchedulerCfg::default()
    };
    let scheduler = Scheduler::new(cfg, orchestrator, adapters, store, notifier.clone(), board.clone())
        .with_health_sink(notifier);
    let worker = scheduler.spawn();

    let router = create_router(AppState { board }, Some(&metrics));
    let listener = tokio::net::TcpListener::bind(&settings.http_addr)
        .await
        .with_context(|| format!("binding {}", settings.http_addr))?;
    tracing::info!(addr = %settings.http_addr, "http listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("http server")?;
    worker.abort();
    Ok(())
}
