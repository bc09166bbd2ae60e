// src/model.rs
//! Core data model: wish-list entries, site descriptors and the per-cycle
//! listing records flowing through the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a source as it appears in the ledger (`sites.name`).
pub type SourceId = String;

/// Surrogate id of a wish-list entry.
pub type WishId = i64;

/// A user's saved search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WishListEntry {
    pub id: WishId,
    pub owner_id: i64,
    /// Space-separated token query.
    pub title: String,
    /// Optional space-separated blacklist.
    pub exclude_terms: Option<String>,
}

impl WishListEntry {
    pub fn new(id: WishId, owner_id: i64, title: &str) -> Self {
        Self {
            id,
            owner_id,
            title: title.to_string(),
            exclude_terms: None,
        }
    }

    pub fn excluding(mut self, terms: &str) -> Self {
        self.exclude_terms = Some(terms.to_string());
        self
    }
}

impl fmt::Display for WishListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.title.chars();
        if let Some(first) = chars.next() {
            write!(f, "{}{}", first.to_uppercase(), chars.as_str())?;
        }
        if let Some(ex) = &self.exclude_terms {
            let terms = ex.split_whitespace().collect::<Vec<_>>().join(", ");
            write!(f, " (exclude: {terms})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    ByClass,
    ByTag,
}

/// How to pull one field out of a listing element: the text of the first
/// matching descendant, or one of its attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDescriptor {
    #[serde(rename = "by")]
    pub kind: SelectorKind,
    #[serde(rename = "value")]
    pub value: String,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldDescriptor {
    pub fn class(value: &str) -> Self {
        Self {
            kind: SelectorKind::ByClass,
            value: value.to_string(),
            attribute: None,
        }
    }

    pub fn tag(value: &str) -> Self {
        Self {
            kind: SelectorKind::ByTag,
            value: value.to_string(),
            attribute: None,
        }
    }

    pub fn attr(mut self, name: &str) -> Self {
        self.attribute = Some(name.to_string());
        self
    }
}

/// Declarative description of one listing source. Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteDescriptor {
    pub primary_url: String,
    #[serde(default)]
    pub secondary_url: Option<String>,
    pub group: FieldDescriptor,
    #[serde(default)]
    pub id_field: Option<FieldDescriptor>,
    pub link_field: FieldDescriptor,
    pub image_field: FieldDescriptor,
    pub title_field: FieldDescriptor,
    pub price_field: FieldDescriptor,
    #[serde(default)]
    pub full_text_field: Option<FieldDescriptor>,
    #[serde(default)]
    pub author_field: Option<FieldDescriptor>,
    #[serde(default)]
    pub link_prefix: String,
}

impl SiteDescriptor {
    /// URL for the first or second page of the catalogue.
    pub fn url(&self, second_page: bool) -> &str {
        match (&self.secondary_url, second_page) {
            (Some(u), true) => u,
            _ => &self.primary_url,
        }
    }
}

/// One extracted listing element, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub external_id: String,
    pub link: String,
    pub image: String,
    pub title: String,
    pub price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingRecord {
    pub source_id: SourceId,
    pub external_id: String,
    pub link: String,
    pub image: String,
    pub title: String,
    pub price: String,
    pub full_text: Option<String>,
    /// Wish entry this listing matched, by id.
    pub matched_wish: Option<WishId>,
}

/// One row of the dedup ledger. Never mutated; eviction deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub source_id: SourceId,
    pub external_id: String,
    pub linked_wish_id: Option<WishId>,
}
