// tests/scheduler_pass.rs
//
// A whole scheduler pass: every source runs concurrently, matches are
// delivered with their wish, and health is reported.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use listing_watch::config::{build_adapters, parse_sources};
use listing_watch::error::CycleError;
use listing_watch::fetch::{DetailFetcher, FetchedPage, Renderer};
use listing_watch::health::HealthBoard;
use listing_watch::ledger::DedupLedger;
use listing_watch::model::WishListEntry;
use listing_watch::notify::{EmissionSink, HealthSink, MatchEvent};
use listing_watch::orchestrator::SourceOrchestrator;
use listing_watch::scheduler::{Scheduler, SchedulerCfg};
use listing_watch::sites::SiteAdapter;
use listing_watch::store::MemoryLedgerStore;
use listing_watch::wishlist::MemoryWishStore;

const SOURCES: &str = include_str!("fixtures/sources.toml");

struct Pages {
    pages: HashMap<&'static str, &'static str>,
    delay: Option<(&'static str, Duration)>,
}

#[async_trait]
impl Renderer for Pages {
    async fn render(&self, url: &str) -> Result<String> {
        if let Some((slow, d)) = self.delay {
            if slow == url {
                tokio::time::sleep(d).await;
            }
        }
        match self.pages.get(url) {
            Some(p) => Ok(p.to_string()),
            None => bail!("404 {url}"),
        }
    }
}

#[async_trait]
impl DetailFetcher for Pages {
    async fn fetch_text(&self, _url: &str) -> Result<FetchedPage> {
        Ok(FetchedPage::default())
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<MatchEvent>>,
    reports: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl EmissionSink for Recorder {
    async fn emit(&self, ev: &MatchEvent) -> Result<()> {
        self.events.lock().unwrap().push(ev.clone());
        Ok(())
    }
}

#[async_trait]
impl HealthSink for Recorder {
    async fn report(&self, not_working: &[String]) -> Result<()> {
        self.reports.lock().unwrap().push(not_working.to_vec());
        Ok(())
    }
}

fn scheduler(pages: Pages, timeout_secs: u64, recorder: Arc<Recorder>) -> Scheduler {
    let pages = Arc::new(pages);
    let ledger = Arc::new(DedupLedger::new(Arc::new(MemoryLedgerStore::default())));
    let orch = SourceOrchestrator::new(pages.clone(), pages, ledger);
    let adapters: Vec<Arc<dyn SiteAdapter>> = build_adapters(parse_sources(SOURCES).unwrap())
        .into_iter()
        .map(Arc::from)
        .collect();
    let wishes = Arc::new(MemoryWishStore::with_entries(vec![
        WishListEntry::new(1, 1, "dune").excluding("messiah"),
        WishListEntry::new(2, 1, "lord rings"),
        WishListEntry::new(3, 1, "art"),
        WishListEntry::new(4, 2, "emma"),
    ]));
    let cfg = SchedulerCfg {
        interval_secs: 60,
        source_timeout_secs: timeout_secs,
        owner_id: 1,
        emit_pause_ms: 0,
    };
    Scheduler::new(cfg, orch, adapters, wishes, recorder.clone(), Arc::new(HealthBoard::new()))
        .with_health_sink(recorder)
}

fn shop_pages() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("https://shop.test/books", include_str!("fixtures/shop_page1.html")),
        ("https://shop.test/books?page=2", include_str!("fixtures/shop_page2.html")),
    ])
}

#[tokio::test]
async fn pass_delivers_matches_once_and_reports_health() {
    let recorder = Arc::new(Recorder::default());
    let s = scheduler(
        Pages {
            pages: shop_pages(),
            delay: None,
        },
        30,
        recorder.clone(),
    );

    let first = s.run_once().await.unwrap();
    assert_eq!(first.emitted, 3);
    assert_eq!(first.not_working, vec!["Broken".to_string()]);
    assert_eq!(first.reports.len(), 2);
    assert_eq!(first.reports[0].source, "Shop");

    {
        let events = recorder.events.lock().unwrap();
        let pairs: Vec<(&str, &str)> = events
            .iter()
            .map(|e| (e.listing.external_id.as_str(), e.wish.title.as_str()))
            .collect();
        assert_eq!(pairs, vec![("103", "lord rings"), ("201", "dune"), ("202", "art")]);
    }

    let second = s.run_once().await.unwrap();
    assert_eq!(second.emitted, 0);
    assert_eq!(recorder.events.lock().unwrap().len(), 3);
    assert_eq!(recorder.reports.lock().unwrap().len(), 2);

    let snap = s.board().snapshot();
    assert!(!snap.ok);
    assert!(snap.sources["Shop"].works);
    assert!(!snap.sources["Broken"].works);
    assert!(snap.last_cycle.is_some());
}

#[tokio::test]
async fn slow_source_times_out_without_blocking_others() {
    let recorder = Arc::new(Recorder::default());
    let mut pages = shop_pages();
    pages.insert("https://broken.test/books", include_str!("fixtures/shop_page2.html"));
    let s = scheduler(
        Pages {
            pages,
            delay: Some(("https://broken.test/books", Duration::from_secs(5))),
        },
        1,
        recorder.clone(),
    );

    let pass = s.run_once().await.unwrap();
    let broken = pass.reports.iter().find(|r| r.source == "Broken").unwrap();
    assert!(matches!(broken.error, Some(CycleError::Timeout(1))));
    assert_eq!(pass.not_working, vec!["Broken".to_string()]);
    assert_eq!(pass.emitted, 3);
}

#[tokio::test]
async fn page_two_timeout_still_delivers_recorded_page_one() {
    let recorder = Arc::new(Recorder::default());
    let s = scheduler(
        Pages {
            pages: shop_pages(),
            delay: Some(("https://shop.test/books?page=2", Duration::from_secs(5))),
        },
        1,
        recorder.clone(),
    );

    let first = s.run_once().await.unwrap();
    let shop = first.reports.iter().find(|r| r.source == "Shop").unwrap();
    assert!(matches!(shop.error, Some(CycleError::Timeout(1))));
    assert_eq!(shop.pages, 1);
    assert!(shop.works());
    assert_eq!(first.emitted, 1);

    // Page 1 is fully seen now, so the next pass neither paginates nor re-sends.
    let second = s.run_once().await.unwrap();
    assert_eq!(second.emitted, 0);
    let shop = second.reports.iter().find(|r| r.source == "Shop").unwrap();
    assert!(shop.error.is_none());

    let events = recorder.events.lock().unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.listing.external_id.as_str()).collect();
    assert_eq!(ids, vec!["103"]);
}
