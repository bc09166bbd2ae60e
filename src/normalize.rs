// src/normalize.rs
//! Text cleanup for extracted listings and optional full-text enrichment
//! from the listing's detail page.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::extract::{self, Document};
use crate::fetch::DetailFetcher;
use crate::model::{ListingRecord, RawListing, SiteDescriptor};

const TITLE_STRIP: [char; 5] = [',', '.', '«', '»', '›'];
const FULL_TEXT_STRIP: [char; 12] = ['"', '\'', '(', ')', '/', '-', '[', ']', ':', ';', '|', '\\'];

/// Lower-case and drop `, . « » ›`.
pub fn normalize_title(s: &str) -> String {
    s.replace(TITLE_STRIP, "").to_lowercase().trim().to_string()
}

/// Lower-case, collapse whitespace, trim.
pub fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re.replace_all(s.trim(), " ").to_lowercase()
}

pub fn strip_full_text(s: &str) -> String {
    s.replace(FULL_TEXT_STRIP, "")
}

/// Clean a raw listing into a record for `source_id`.
pub fn normalize(source_id: &str, raw: RawListing, descriptor: &SiteDescriptor) -> ListingRecord {
    ListingRecord {
        source_id: source_id.to_string(),
        external_id: raw.external_id.trim().to_string(),
        link: format!("{}{}", descriptor.link_prefix, raw.link.trim()),
        image: raw.image.trim().to_string(),
        title: normalize_title(&raw.title),
        price: raw.price.trim().to_string(),
        full_text: None,
        matched_wish: None,
    }
}

/// Pull the descriptor's full-text field out of a detail page body.
pub fn full_text_from_page(body: &str, descriptor: &SiteDescriptor) -> Option<String> {
    let fd = descriptor.full_text_field.as_ref()?;
    let doc = Document::parse(body);
    let root = doc.html().root_element();
    extract::field_value(root, fd).ok().map(|t| collapse_ws(&t))
}

/// Attach `full_text` when the source defines a full-text field.
///
/// Fetch errors and non-success responses leave the full text as the title
/// alone; enrichment never fails the record.
pub async fn enrich(mut record: ListingRecord, descriptor: &SiteDescriptor, fetcher: &dyn DetailFetcher) -> ListingRecord {
    if descriptor.full_text_field.is_none() {
        return record;
    }

    let mut full = record.title.clone();
    match fetcher.fetch_text(&record.link).await {
        Ok(page) if page.ok => {
            if let Some(text) = full_text_from_page(&page.body, descriptor) {
                full.push(' ');
                full.push_str(&text);
            }
        }
        Ok(_) => {
            tracing::warn!(target: "extract", link = %record.link, "detail page returned non-success status");
        }
        Err(e) => {
            tracing::warn!(target: "extract", link = %record.link, error = %e, "detail page fetch failed");
        }
    }
    record.full_text = Some(strip_full_text(&full));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedPage;
    use crate::model::FieldDescriptor;
    use anyhow::Result;

    fn descriptor() -> SiteDescriptor {
        SiteDescriptor {
            primary_url: "https://shop.test".into(),
            secondary_url: None,
            group: FieldDescriptor::class("card"),
            id_field: None,
            link_field: FieldDescriptor::tag("a").attr("href"),
            image_field: FieldDescriptor::tag("img").attr("src"),
            title_field: FieldDescriptor::tag("h6"),
            price_field: FieldDescriptor::class("price"),
            full_text_field: Some(FieldDescriptor::class("descr")),
            author_field: None,
            link_prefix: "https://shop.test".into(),
        }
    }

    struct Fixed(Option<FetchedPage>);

    #[async_trait::async_trait]
    impl DetailFetcher for Fixed {
        async fn fetch_text(&self, _url: &str) -> Result<FetchedPage> {
            self.0.clone().ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    #[test]
    fn title_is_lowercased_and_stripped() {
        assert_eq!(normalize_title(" «Dune», Vol. 1 › "), "dune vol 1");
    }

    #[test]
    fn normalize_prefixes_link_and_trims() {
        let raw = RawListing {
            external_id: " 42 ".into(),
            link: " /item/42 ".into(),
            image: "i".into(),
            title: "Dune.".into(),
            price: " 100 грн\n".into(),
        };
        let r = normalize("shop", raw, &descriptor());
        assert_eq!(r.external_id, "42");
        assert_eq!(r.link, "https://shop.test/item/42");
        assert_eq!(r.title, "dune");
        assert_eq!(r.price, "100 грн");
        assert!(r.full_text.is_none());
    }

    #[tokio::test]
    async fn enrich_appends_detail_text() {
        let page = FetchedPage {
            ok: true,
            body: r#"<div class="descr">Hardcover
                (first) EDITION - "mint"</div>"#
                .into(),
        };
        let rec = ListingRecord {
            source_id: "shop".into(),
            external_id: "1".into(),
            link: "https://shop.test/1".into(),
            image: String::new(),
            title: "dune".into(),
            price: String::new(),
            full_text: None,
            matched_wish: None,
        };
        let out = enrich(rec, &descriptor(), &Fixed(Some(page))).await;
        assert_eq!(out.full_text.as_deref(), Some("dune hardcover first edition  mint"));
    }

    #[tokio::test]
    async fn enrich_degrades_to_title_on_failure() {
        let rec = ListingRecord {
            source_id: "shop".into(),
            external_id: "1".into(),
            link: "https://shop.test/1".into(),
            image: String::new(),
            title: "dune".into(),
            price: String::new(),
            full_text: None,
            matched_wish: None,
        };
        let out = enrich(rec.clone(), &descriptor(), &Fixed(None)).await;
        assert_eq!(out.full_text.as_deref(), Some("dune"));

        let not_ok = Fixed(Some(FetchedPage { ok: false, body: "<div class=\"descr\">x</div>".into() }));
        let out = enrich(rec, &descriptor(), &not_ok).await;
        assert_eq!(out.full_text.as_deref(), Some("dune"));
    }
}
