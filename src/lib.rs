// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod health;
pub mod ledger;
pub mod matching;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod pagination;
pub mod scheduler;
pub mod sites;
pub mod store;
pub mod wishlist;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::Settings;
pub use crate::error::{CycleError, FieldError};
pub use crate::ledger::DedupLedger;
pub use crate::model::{FieldDescriptor, ListingRecord, SiteDescriptor, WishListEntry};
pub use crate::notify::{MatchEvent, NotifierMux};
pub use crate::orchestrator::{CycleReport, SourceOrchestrator};
pub use crate::scheduler::{Scheduler, SchedulerCfg};
