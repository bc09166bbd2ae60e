// src/orchestrator.rs
//! Drives one source through render → extract → normalize → dedup → match,
//! with at most one extra page.

use metrics::{counter, histogram};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::CycleError;
use crate::extract::{extract, Document};
use crate::fetch::{DetailFetcher, Renderer};
use crate::ledger::DedupLedger;
use crate::matching::match_all;
use crate::model::{ListingRecord, WishListEntry};
use crate::normalize::{enrich, normalize};
use crate::pagination::needs_second_page;
use crate::sites::SiteAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Rendering,
    Extracting,
    Matching,
    RenderingPage2,
    Done,
}

/// What one source cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    pub source: String,
    /// New listings that matched a wish, already recorded in the ledger.
    pub matched: Vec<ListingRecord>,
    /// Whether any page of the cycle yielded listings. Drives the "works" flag.
    pub saw_any: bool,
    pub pages: u8,
    pub error: Option<CycleError>,
}

impl CycleReport {
    pub fn failed(source: &str, error: CycleError) -> Self {
        Self {
            source: source.to_string(),
            matched: Vec::new(),
            saw_any: false,
            pages: 0,
            error: Some(error),
        }
    }

    pub fn works(&self) -> bool {
        self.saw_any
    }
}

/// Time budget for one source cycle. Only render and detail fetches are
/// bounded by it, so a page that reached the ledger is never cut short.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    secs: u64,
}

async fn within<F: Future>(deadline: Option<Deadline>, fut: F) -> Result<F::Output, CycleError> {
    match deadline {
        Some(d) => tokio::time::timeout_at(d.at, fut)
            .await
            .map_err(|_| CycleError::Timeout(d.secs)),
        None => Ok(fut.await),
    }
}

struct PageOutcome {
    saw_any: bool,
    matched: Vec<ListingRecord>,
    paginate: bool,
}

/// Shared collaborators for source cycles. Cheap to clone into tasks.
#[derive(Clone)]
pub struct SourceOrchestrator {
    renderer: Arc<dyn Renderer>,
    fetcher: Arc<dyn DetailFetcher>,
    ledger: Arc<DedupLedger>,
}

impl SourceOrchestrator {
    pub fn new(renderer: Arc<dyn Renderer>, fetcher: Arc<dyn DetailFetcher>, ledger: Arc<DedupLedger>) -> Self {
        Self {
            renderer,
            fetcher,
            ledger,
        }
    }

    /// Run one full cycle for `adapter` against the given wish snapshot.
    ///
    /// Render failures end the cycle with whatever earlier pages produced.
    /// Ledger failures drop the failing page's matches: nothing is reported
    /// that was not durably recorded as seen.
    pub async fn run_cycle(&self, adapter: &dyn SiteAdapter, wishes: &[WishListEntry]) -> CycleReport {
        self.cycle(adapter, wishes, None).await
    }

    /// Like [`run_cycle`](Self::run_cycle), but renders and detail fetches
    /// stop at `limit` after the start. A timeout keeps the pages already
    /// recorded and reports `CycleError::Timeout`.
    pub async fn run_cycle_within(&self, adapter: &dyn SiteAdapter, wishes: &[WishListEntry], limit: Duration) -> CycleReport {
        let deadline = Deadline {
            at: Instant::now() + limit,
            secs: limit.as_secs(),
        };
        self.cycle(adapter, wishes, Some(deadline)).await
    }

    async fn cycle(&self, adapter: &dyn SiteAdapter, wishes: &[WishListEntry], deadline: Option<Deadline>) -> CycleReport {
        let t0 = std::time::Instant::now();
        let mut report = CycleReport {
            source: adapter.name().to_string(),
            matched: Vec::new(),
            saw_any: false,
            pages: 0,
            error: None,
        };

        let mut state = CycleState::Idle;
        let mut second_page = false;
        loop {
            state = advance(adapter.name(), state, if second_page { CycleState::RenderingPage2 } else { CycleState::Rendering });
            match self.process_page(adapter, wishes, second_page, deadline, &mut state).await {
                Ok(page) => {
                    report.pages += 1;
                    report.saw_any |= page.saw_any;
                    report.matched.extend(page.matched);
                    if page.paginate && !second_page {
                        second_page = true;
                        continue;
                    }
                }
                Err(e) => {
                    match &e {
                        CycleError::Render { .. } => {
                            counter!("watch_render_errors_total", "source" => adapter.name().to_string()).increment(1);
                            tracing::warn!(target: "cycle", source = adapter.name(), error = %e, "source did not render");
                        }
                        CycleError::Timeout(_) => {
                            tracing::warn!(target: "cycle", source = adapter.name(), pages = report.pages, "source cycle timed out");
                        }
                        _ => tracing::error!(target: "cycle", source = adapter.name(), error = %e, "source cycle failed"),
                    }
                    report.error = Some(e);
                }
            }
            break;
        }
        advance(adapter.name(), state, CycleState::Done);

        histogram!("watch_cycle_ms", "source" => adapter.name().to_string())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::info!(
            target: "cycle",
            source = adapter.name(),
            pages = report.pages,
            matched = report.matched.len(),
            works = report.saw_any,
            "source cycle finished"
        );
        report
    }

    async fn render(&self, url: &str, deadline: Option<Deadline>) -> Result<String, CycleError> {
        within(deadline, self.renderer.render(url))
            .await?
            .map_err(|source| CycleError::Render {
                url: url.to_string(),
                source,
            })
    }

    async fn process_page(
        &self,
        adapter: &dyn SiteAdapter,
        wishes: &[WishListEntry],
        second_page: bool,
        deadline: Option<Deadline>,
        state: &mut CycleState,
    ) -> Result<PageOutcome, CycleError> {
        let name = adapter.name();
        let descriptor = adapter.descriptor();
        let url = descriptor.url(second_page);

        let page = self.render(url, deadline).await?;

        *state = advance(name, *state, CycleState::Extracting);
        let mut extraction = {
            let doc = Document::parse(&page);
            extract(&doc, adapter)
        };
        if extraction.group_len == 0 {
            // A page served before its listings loaded comes back empty once.
            tracing::debug!(target: "cycle", source = name, url, "empty group, rendering again");
            let page = self.render(url, deadline).await?;
            extraction = {
                let doc = Document::parse(&page);
                extract(&doc, adapter)
            };
            if extraction.group_len == 0 {
                tracing::error!(target: "cycle", source = name, url, "no listings found");
            }
        }
        tracing::info!(
            target: "cycle",
            source = name,
            url,
            group = extraction.group_len,
            skipped = extraction.skipped,
            found = extraction.listings.len(),
            "listings extracted"
        );

        *state = advance(name, *state, CycleState::Matching);
        let records: Vec<ListingRecord> = extraction
            .listings
            .into_iter()
            .map(|r| normalize(name, r, descriptor))
            .collect();

        let session = self.ledger.session(name).await;
        let ids: HashSet<String> = records.iter().map(|r| r.external_id.clone()).collect();
        let seen = session.already_seen(&ids).await.map_err(CycleError::Ledger)?;
        let paginate = needs_second_page(&records, &seen, descriptor);

        let mut fresh_ids = HashSet::new();
        let mut fresh = Vec::new();
        for r in records.iter() {
            if !seen.contains(&r.external_id) && fresh_ids.insert(r.external_id.clone()) {
                fresh.push(within(deadline, enrich(r.clone(), descriptor, self.fetcher.as_ref())).await?);
            }
        }
        tracing::debug!(target: "cycle", source = name, new = fresh.len(), seen = seen.len(), "dedup done");
        counter!("watch_listings_new_total", "source" => name.to_string()).increment(fresh.len() as u64);

        let matched = match_all(&mut fresh, wishes);
        session.record_seen(&fresh).await.map_err(CycleError::Ledger)?;
        counter!("watch_matches_total", "source" => name.to_string()).increment(matched.len() as u64);

        Ok(PageOutcome {
            saw_any: !records.is_empty(),
            matched,
            paginate,
        })
    }
}

fn advance(source: &str, from: CycleState, to: CycleState) -> CycleState {
    tracing::trace!(target: "cycle", source, ?from, ?to, "state");
    to
}
