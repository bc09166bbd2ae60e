// src/sites/shafa.rs
use scraper::ElementRef;

use super::{last_segment, SiteAdapter};
use crate::error::FieldError;
use crate::extract;
use crate::model::SiteDescriptor;

const CURRENCY: &str = "грн";

/// Ids are the numeric prefix of the link slug (`/books/12345-dune`);
/// prices carry trailing noise after the currency marker.
pub struct ShafaAdapter {
    name: String,
    descriptor: SiteDescriptor,
}

impl ShafaAdapter {
    pub fn new(name: &str, descriptor: SiteDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }
}

impl SiteAdapter for ShafaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &SiteDescriptor {
        &self.descriptor
    }

    fn external_id(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        let link = self.link(el)?;
        match last_segment(&link).split('-').next() {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(FieldError::BadLink(link)),
        }
    }

    fn price(&self, el: ElementRef<'_>) -> Result<String, FieldError> {
        let raw = extract::field_value(el, &self.descriptor.price_field)?;
        let amount = raw.split(CURRENCY).next().unwrap_or_default();
        Ok(format!("{amount}{CURRENCY}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, Document};
    use crate::sites::test_support::descriptor;

    #[test]
    fn id_from_slug_and_price_trimmed() {
        let doc = Document::parse(
            r#"<div class="card"><a href="/uk/books/55821-dune-frank-herbert">x</a><h6>Dune</h6>
               <span class="price">120 грн 150 грн -20%</span></div>"#,
        );
        let out = extract(&doc, &ShafaAdapter::new("Shafa", descriptor()));
        assert_eq!(out.listings[0].external_id, "55821");
        assert_eq!(out.listings[0].price, "120 грн");
    }
}
