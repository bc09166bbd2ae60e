// src/scheduler.rs
//! Periodic driver: one pass runs every source concurrently against a single
//! wish-list snapshot, then delivers matches and the health report.

use anyhow::{Context, Result};
use metrics::gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::error::CycleError;
use crate::health::HealthBoard;
use crate::model::WishListEntry;
use crate::notify::{EmissionSink, HealthSink, MatchEvent};
use crate::orchestrator::{CycleReport, SourceOrchestrator};
use crate::sites::SiteAdapter;
use crate::wishlist::WishListStore;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    pub source_timeout_secs: u64,
    pub owner_id: i64,
    /// Pause between two delivered matches.
    pub emit_pause_ms: u64,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            source_timeout_secs: 90,
            owner_id: 1,
            emit_pause_ms: 100,
        }
    }
}

/// Outcome of one pass over all sources.
#[derive(Debug)]
pub struct PassSummary {
    pub reports: Vec<CycleReport>,
    pub emitted: usize,
    pub not_working: Vec<String>,
}

pub struct Scheduler {
    cfg: SchedulerCfg,
    orchestrator: SourceOrchestrator,
    adapters: Vec<Arc<dyn SiteAdapter>>,
    wishes: Arc<dyn WishListStore>,
    emitter: Arc<dyn EmissionSink>,
    health: Vec<Arc<dyn HealthSink>>,
    board: Arc<HealthBoard>,
}

impl Scheduler {
    pub fn new(
        cfg: SchedulerCfg,
        orchestrator: SourceOrchestrator,
        adapters: Vec<Arc<dyn SiteAdapter>>,
        wishes: Arc<dyn WishListStore>,
        emitter: Arc<dyn EmissionSink>,
        board: Arc<HealthBoard>,
    ) -> Self {
        Self {
            cfg,
            orchestrator,
            adapters,
            wishes,
            emitter,
            health: Vec::new(),
            board,
        }
    }

    /// Extra health report receiver, called after the board.
    pub fn with_health_sink(mut self, sink: Arc<dyn HealthSink>) -> Self {
        self.health.push(sink);
        self
    }

    pub fn board(&self) -> &Arc<HealthBoard> {
        &self.board
    }

    /// One pass. Fails only when the wish list cannot be read; per-source
    /// failures end up in the reports.
    pub async fn run_once(&self) -> Result<PassSummary> {
        let wishes: Arc<Vec<WishListEntry>> = Arc::new(
            self.wishes
                .active_entries_for(self.cfg.owner_id)
                .await
                .context("loading wish list")?,
        );
        tracing::debug!(target: "cycle", wishes = wishes.len(), sources = self.adapters.len(), "pass start");

        let timeout = Duration::from_secs(self.cfg.source_timeout_secs);
        let mut set = JoinSet::new();
        for (idx, adapter) in self.adapters.iter().enumerate() {
            let adapter = adapter.clone();
            let orch = self.orchestrator.clone();
            let wishes = wishes.clone();
            let secs = self.cfg.source_timeout_secs;
            set.spawn(async move {
                // The cycle bounds its own network calls. The outer guard only
                // catches a ledger call that never returns.
                let cycle = orch.run_cycle_within(adapter.as_ref(), &wishes, timeout);
                let report = match tokio::time::timeout(timeout * 2, cycle).await {
                    Ok(report) => report,
                    Err(_) => {
                        tracing::error!(target: "cycle", source = adapter.name(), secs, "source cycle stuck past its deadline");
                        CycleReport::failed(adapter.name(), CycleError::Timeout(secs))
                    }
                };
                (idx, report)
            });
        }

        let mut indexed = Vec::with_capacity(self.adapters.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(pair) => indexed.push(pair),
                Err(e) => tracing::error!(target: "cycle", error = %e, "source task panicked"),
            }
        }
        indexed.sort_by_key(|(idx, _)| *idx);
        let reports: Vec<CycleReport> = indexed.into_iter().map(|(_, r)| r).collect();

        let mut emitted = 0;
        for report in &reports {
            self.board.record(report);
            for listing in &report.matched {
                let Some(wish) = listing
                    .matched_wish
                    .and_then(|id| wishes.iter().find(|w| w.id == id))
                else {
                    continue;
                };
                let ev = MatchEvent {
                    listing: listing.clone(),
                    wish: wish.clone(),
                };
                if let Err(e) = self.emitter.emit(&ev).await {
                    tracing::warn!(target: "notify", source = %listing.source_id, error = %e, "match not delivered");
                    continue;
                }
                emitted += 1;
                if self.cfg.emit_pause_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.cfg.emit_pause_ms)).await;
                }
            }
        }

        // Sources whose task panicked have no report and count as not working.
        let not_working: Vec<String> = self
            .adapters
            .iter()
            .map(|a| a.name())
            .filter(|name| !reports.iter().any(|r| r.source == *name && r.works()))
            .map(str::to_string)
            .collect();

        if let Err(e) = self.board.report(&not_working).await {
            tracing::warn!(target: "cycle", error = %e, "health board update failed");
        }
        for sink in &self.health {
            if let Err(e) = sink.report(&not_working).await {
                tracing::warn!(target: "notify", error = %e, "health report failed");
            }
        }

        gauge!("watch_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            target: "cycle",
            sources = reports.len(),
            emitted,
            not_working = not_working.len(),
            "pass finished"
        );
        Ok(PassSummary {
            reports,
            emitted,
            not_working,
        })
    }

    /// Run passes every `interval_secs` until the task is dropped.
    pub async fn run_forever(self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                tracing::error!(target: "cycle", error = %e, "pass failed, retrying next tick");
            }
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run_forever())
    }
}
