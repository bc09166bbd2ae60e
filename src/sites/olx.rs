// src/sites/olx.rs
use scraper::ElementRef;

use super::SiteAdapter;
use crate::error::FieldError;
use crate::model::SiteDescriptor;

/// Listing cards carry their id on the card element itself.
pub struct OlxAdapter {
    name: String,
    descriptor: SiteDescriptor,
}

impl OlxAdapter {
    pub fn new(name: &str, descriptor: SiteDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }
}

impl SiteAdapter for OlxAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    fn external_id(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        el.value()
            .attr("id")
            .map(str::to_string)
            .ok_or_else(|| FieldError::NoAttribute {
                selector: "listing card".into(),
                attribute: "id".into(),
            })
    }
}
