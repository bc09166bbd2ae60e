// src/sites/mod.rs
//! Per-source adapters. Each adapter holds a `SiteDescriptor` and overrides
//! only the few extraction steps its source needs.

pub mod izi;
pub mod liberby;
pub mod olx;
pub mod shafa;

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::extract::{self, Document, PLACEHOLDER_IMAGE};
use crate::model::{RawListing, SiteDescriptor};

pub trait SiteAdapter: Send + Sync {
    fn name(&self) -> &str;
    fn descriptor(&self) -> &SiteDescriptor;

    fn locate_group<'a>(&self, doc: &'a Document) -> Vec<ElementRef<'a>> {
        doc.find_all(&self.descriptor().group)
    }

    fn is_valid(&self, el: ElementRef<'_>) -> bool {
        extract::default_validity(el)
    }

    fn external_id(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        let fd = self.descriptor().id_field.as_ref().ok_or(FieldError::NoIdField)?;
        extract::field_value(el, fd)
    }

    fn link(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        extract::field_value(el, &self.descriptor().link_field)
    }

    /// Never fails: a missing or "no_thumbnail" image becomes the placeholder.
    fn image(&self, el: ElementRef<'_>) -> String {
        match extract::field_value(el, &self.descriptor().image_field) {
            Ok(src) if !src.trim().is_empty() && !src.contains("no_thumbnail") => src,
            _ => PLACEHOLDER_IMAGE.to_string(),
        }
    }

    fn title(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        extract::field_value(el, &self.descriptor().title_field)
    }

    fn price(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        extract::field_value(el, &self.descriptor().price_field)
    }

    fn raw_listing(&self, el: ElementRef<'_>) -> Result<RawListing, FieldError> {
        Ok(RawListing {
            external_id: self.external_id(el)?,
            link: self.link(el)?,
            image: self.image(el),
            title: self.title(el)?,
            price: self.price(el)?,
        })
    }
}

/// Last `/`-separated segment of a link path.
pub(crate) fn last_segment(link: &str) -> &str {
    link.trim().trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

/// Descriptor-only adapter.
pub struct GenericAdapter {
    name: String,
    descriptor: SiteDescriptor,
}

impl GenericAdapter {
    pub fn new(name: &str, descriptor: SiteDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }
}

impl SiteAdapter for GenericAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    #[default]
    Generic,
    Olx,
    Shafa,
    Liberby,
    Izi,
}

pub fn build_adapter(kind: AdapterKind, name: &str, descriptor: SiteDescriptor) -> Box<dyn SiteAdapter> {
    match kind {
        AdapterKind::Generic => Box::new(GenericAdapter::new(name, descriptor)),
        AdapterKind::Olx => Box::new(olx::OlxAdapter::new(name, descriptor)),
        AdapterKind::Shafa => Box::new(shafa::ShafaAdapter::new(name, descriptor)),
        AdapterKind::Liberby => Box::new(liberby::LiberbyAdapter::new(name, descriptor)),
        AdapterKind::Izi => Box::new(izi::IziAdapter::new(name, descriptor)),
    }
}
