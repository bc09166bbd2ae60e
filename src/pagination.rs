// src/pagination.rs
use std::collections::HashSet;

use crate::model::{ListingRecord, SiteDescriptor};

/// A second page is worth fetching only when nothing on the first page had
/// been seen before and the source has a second page at all. Listings are
/// newest-first, so one known listing means the rest is stale.
pub fn needs_second_page(
    listings: &[ListingRecord],
    already_seen: &HashSet<String>,
    descriptor: &SiteDescriptor,
) -> bool {
    descriptor.secondary_url.is_some()
        && listings.iter().all(|l| !already_seen.contains(&l.external_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldDescriptor;

    fn descriptor(secondary: Option<&str>) -> SiteDescriptor {
        SiteDescriptor {
            primary_url: "https://shop.test/1".into(),
            secondary_url: secondary.map(str::to_string),
            group: FieldDescriptor::class("card"),
            id_field: None,
            link_field: FieldDescriptor::tag("a").attr("href"),
            image_field: FieldDescriptor::tag("img").attr("src"),
            title_field: FieldDescriptor::tag("h6"),
            price_field: FieldDescriptor::class("price"),
            full_text_field: None,
            author_field: None,
            link_prefix: String::new(),
        }
    }

    fn page() -> Vec<ListingRecord> {
        ["a", "b", "c"]
            .iter()
            .map(|id| ListingRecord {
                source_id: "shop".into(),
                external_id: id.to_string(),
                link: String::new(),
                image: String::new(),
                title: String::new(),
                price: String::new(),
                full_text: None,
                matched_wish: None,
            })
            .collect()
    }

    #[test]
    fn all_new_with_secondary_url_paginates() {
        let d = descriptor(Some("https://shop.test/2"));
        assert!(needs_second_page(&page(), &HashSet::new(), &d));
    }

    #[test]
    fn one_known_listing_stops_pagination() {
        let d = descriptor(Some("https://shop.test/2"));
        let seen = HashSet::from(["b".to_string()]);
        assert!(!needs_second_page(&page(), &seen, &d));
    }

    #[test]
    fn no_secondary_url_never_paginates() {
        assert!(!needs_second_page(&page(), &HashSet::new(), &descriptor(None)));
    }
}
