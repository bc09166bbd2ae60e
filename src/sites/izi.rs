// src/sites/izi.rs
use scraper::ElementRef;

use super::{last_segment, SiteAdapter};
use crate::error::FieldError;
use crate::extract::{self, Document};
use crate::model::{FieldDescriptor, SiteDescriptor};

const BRAND_MARKER: &str = "ek-text_color_brand-blue";

/// Listings are the children of the second block inside `<main>`; only cards
/// with a non-promoted brand marker are real listings.
pub struct IziAdapter {
    name: String,
    descriptor: SiteDescriptor,
}

impl IziAdapter {
    pub fn new(name: &str, descriptor: SiteDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }
}

impl SiteAdapter for IziAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    fn locate_group<'a>(&self, doc: &'a Document) -> Vec<ElementRef<'a>> {
        let Some(main) = doc.find_tag("main").into_iter().next() else {
            return Vec::new();
        };
        extract::element_children(main)
            .get(1)
            .map(|block| extract::element_children(*block))
            .unwrap_or_default()
    }

    fn is_valid(&self, el: ElementRef<'_>) -> bool {
        let marks = extract::find_all_in(el, &FieldDescriptor::class(BRAND_MARKER));
        match marks.first() {
            Some(mark) => extract::element_text(*mark) != "ТОП",
            None => false,
        }
    }

    fn external_id(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        let link = self.link(el)?;
        match last_segment(&link).split('-').nth(1) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(FieldError::BadLink(link)),
        }
    }
}
