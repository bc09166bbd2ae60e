// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register help text for every watch_* series once per process.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "watch_listings_extracted_total",
            "Listings extracted from rendered pages."
        );
        describe_counter!(
            "watch_listings_new_total",
            "Listings not seen before in the ledger."
        );
        describe_counter!("watch_matches_total", "New listings that matched a wish.");
        describe_counter!(
            "watch_field_miss_total",
            "Listing elements skipped because a required field was missing."
        );
        describe_counter!("watch_render_errors_total", "Pages that failed to render.");
        describe_counter!(
            "watch_ledger_evictions_total",
            "Ledger rows deleted by retention."
        );
        describe_histogram!("watch_cycle_ms", "Source cycle time in milliseconds.");
        describe_gauge!(
            "watch_last_cycle_ts",
            "Unix ts when the last full cycle finished."
        );
    });
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already set.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
