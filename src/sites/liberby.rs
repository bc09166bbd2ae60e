// src/sites/liberby.rs
use scraper::ElementRef;
use sha2::{Digest, Sha224};

use super::{last_segment, SiteAdapter};
use crate::error::FieldError;
use crate::extract;
use crate::model::SiteDescriptor;

/// No native listing id: the id is a hash of the link slug. Titles are
/// prefixed with the author when the descriptor names an author field.
pub struct LiberbyAdapter {
    name: String,
    descriptor: SiteDescriptor,
}

impl LiberbyAdapter {
    pub fn new(name: &str, descriptor: SiteDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }

    fn author(&self, el: ElementRef<'_>) -> String {
        self.descriptor
            .author_field
            .as_ref()
            .and_then(|fd| extract::field_value(el, fd).ok())
            .unwrap_or_default()
    }
}

/// Hex SHA-224 of the last path segment of `link`.
pub fn link_hash(link: &str) -> String {
    let digest = Sha224::digest(last_segment(link).as_bytes());
    let mut out = String::with_capacity(56);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl SiteAdapter for LiberbyAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    fn external_id(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        Ok(link_hash(&self.link(el)?))
    }

    fn title(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        let title = extract::field_value(el, &self.descriptor.title_field)?;
        Ok(format!("{} {}", self.author(el), title))
    }
}
