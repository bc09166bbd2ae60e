// src/error.rs
use thiserror::Error;

/// A single field could not be pulled out of a listing element.
/// Only the element is skipped; the page carries on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("no element matching {0}")]
    NoElement(String),
    #[error("element {selector} has no attribute `{attribute}`")]
    NoAttribute { selector: String, attribute: String },
    #[error("source has no id field configured")]
    NoIdField,
    #[error("cannot derive id from link `{0}`")]
    BadLink(String),
}

/// Why a source cycle ended without a usable result.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Page could not be rendered; the source is "not working" this cycle.
    #[error("render failed for {url}: {source:#}")]
    Render {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    /// Ledger write failed; no match from this cycle may be reported.
    #[error("ledger failure: {0:#}")]
    Ledger(#[source] anyhow::Error),
    #[error("source cycle timed out after {0}s")]
    Timeout(u64),
}
