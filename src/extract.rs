// src/extract.rs
//! Listing extraction: locate the listing group in a parsed page and turn each
//! surviving element into a `RawListing` through the source's `SiteAdapter`.

use metrics::counter;
use scraper::{ElementRef, Html};

use crate::error::FieldError;
use crate::model::{FieldDescriptor, RawListing, SelectorKind};
use crate::sites::SiteAdapter;

/// Used whenever a listing has no usable image.
pub const PLACEHOLDER_IMAGE: &str =
    "https://www.freeiconspng.com/thumbs/no-image-icon/no-image-icon-6.png";

/// Leading markers of promoted entries that are not real listings.
pub const PROMO_MARKERS: [&str; 2] = ["Top", "ТОП"];

/// Parsed page, owned by a single extraction pass.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Every element in the page matching `fd`, in document order.
    pub fn find_all(&self, fd: &FieldDescriptor) -> Vec<ElementRef<'_>> {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches_descriptor(*el, fd))
            .collect()
    }

    /// Every element named `tag`, in document order.
    pub fn find_tag(&self, tag: &str) -> Vec<ElementRef<'_>> {
        self.find_all(&FieldDescriptor::tag(tag))
    }
}

fn matches_descriptor(el: ElementRef<'_>, fd: &FieldDescriptor) -> bool {
    match fd.kind {
        SelectorKind::ByClass => el.value().classes().any(|c| c == fd.value),
        SelectorKind::ByTag => el.value().name().eq_ignore_ascii_case(&fd.value),
    }
}

fn describe(fd: &FieldDescriptor) -> String {
    match fd.kind {
        SelectorKind::ByClass => format!(".{}", fd.value),
        SelectorKind::ByTag => fd.value.clone(),
    }
}

/// First descendant of `el` (excluding `el` itself) matching `fd`.
pub fn find_first<'a>(el: ElementRef<'a>, fd: &FieldDescriptor) -> Option<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| matches_descriptor(*e, fd))
}

/// All descendants of `el` matching `fd`.
pub fn find_all_in<'a>(el: ElementRef<'a>, fd: &FieldDescriptor) -> Vec<ElementRef<'a>> {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| matches_descriptor(*e, fd))
        .collect()
}

/// Direct element children of `el`.
pub fn element_children(el: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap).collect()
}

/// Concatenated text of the element and all its descendants.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Field value: the named attribute when `fd.attribute` is set, the text otherwise.
pub fn field_value(el: ElementRef<'_>, fd: &FieldDescriptor) -> Result<String, FieldError> {
    let found = find_first(el, fd).ok_or_else(|| FieldError::NoElement(describe(fd)))?;
    match &fd.attribute {
        Some(attr) => found
            .value()
            .attr(attr)
            .map(str::to_string)
            .ok_or_else(|| FieldError::NoAttribute {
                selector: describe(fd),
                attribute: attr.clone(),
            }),
        None => Ok(element_text(found)),
    }
}

/// Default validity check: drop empty elements and promoted entries.
pub fn default_validity(el: ElementRef<'_>) -> bool {
    let text = element_text(el);
    let text = text.trim();
    !text.is_empty() && !PROMO_MARKERS.iter().any(|m| text.starts_with(m))
}

/// Result of one extraction pass over a page.
#[derive(Debug, Default)]
pub struct Extraction {
    pub listings: Vec<RawListing>,
    /// Size of the located group, before validity filtering.
    pub group_len: usize,
    pub skipped: usize,
}

/// Extract raw listings from `doc` with the adapter's rules.
///
/// An empty group yields an empty extraction; the orchestrator re-renders
/// the page once in that case. Field misses skip the element only.
pub fn extract(doc: &Document, adapter: &dyn SiteAdapter) -> Extraction {
    let group = adapter.locate_group(doc);
    if group.is_empty() {
        tracing::warn!(target: "extract", source = adapter.name(), "empty listing group");
        return Extraction::default();
    }

    let mut out = Extraction {
        group_len: group.len(),
        ..Default::default()
    };
    for el in group {
        if !adapter.is_valid(el) {
            out.skipped += 1;
            continue;
        }
        match adapter.raw_listing(el) {
            Ok(raw) => out.listings.push(raw),
            Err(e) => {
                tracing::debug!(target: "extract", source = adapter.name(), error = %e, "skipping listing element");
                counter!("watch_field_miss_total", "source" => adapter.name().to_string())
                    .increment(1);
                out.skipped += 1;
            }
        }
    }

    counter!("watch_listings_extracted_total", "source" => adapter.name().to_string())
        .increment(out.listings.len() as u64);
    out
}
