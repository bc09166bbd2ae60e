// src/health.rs
//! Per-source "works" flags, updated after every source cycle.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::notify::HealthSink;
use crate::orchestrator::CycleReport;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceHealth {
    pub works: bool,
    pub last_cycle: DateTime<Utc>,
    pub pages: u8,
    pub matched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub ok: bool,
    pub last_cycle: Option<DateTime<Utc>>,
    pub not_working: Vec<String>,
    pub sources: BTreeMap<String, SourceHealth>,
}

#[derive(Debug, Default)]
struct Board {
    sources: BTreeMap<String, SourceHealth>,
    not_working: Vec<String>,
    last_cycle: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct HealthBoard {
    inner: RwLock<Board>,
}

impl HealthBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &CycleReport) {
        let entry = SourceHealth {
            works: report.works(),
            last_cycle: Utc::now(),
            pages: report.pages,
            matched: report.matched.len(),
            last_error: report.error.as_ref().map(|e| e.to_string()),
        };
        self.inner
            .write()
            .expect("health board lock poisoned")
            .sources
            .insert(report.source.clone(), entry);
    }

    /// Sources whose last cycle saw no listings, in name order.
    pub fn not_working(&self) -> Vec<String> {
        let board = self.inner.read().expect("health board lock poisoned");
        board
            .sources
            .iter()
            .filter(|(_, h)| !h.works)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let board = self.inner.read().expect("health board lock poisoned");
        HealthSnapshot {
            ok: board.last_cycle.is_some() && board.not_working.is_empty(),
            last_cycle: board.last_cycle,
            not_working: board.not_working.clone(),
            sources: board.sources.clone(),
        }
    }
}

#[async_trait]
impl HealthSink for HealthBoard {
    async fn report(&self, not_working: &[String]) -> Result<()> {
        let mut board = self.inner.write().expect("health board lock poisoned");
        board.not_working = not_working.to_vec();
        board.last_cycle = Some(Utc::now());
        Ok(())
    }
}
