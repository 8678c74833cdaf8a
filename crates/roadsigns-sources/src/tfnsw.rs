//! Transport for NSW traffic sign catalogue (Australia).
//!
//! A paginated listing; each featured item has a heading like
//! `R2-4(L) No left turn`, a link to the sign's page and a thumbnail.

use std::sync::LazyLock;

use regex::Regex;
use roadsigns_core::{PartialRecord, SignRecord, split_sign_codes, strip_label_punctuation};
use tracing::warn;

use crate::SourceError;
use crate::html;

pub const COUNTRY: &str = "AU";
pub const ORIGIN: &str = "https://www.transport.nsw.gov.au";
pub const LISTING_URL: &str =
    "https://www.transport.nsw.gov.au/operations/roads-and-waterways/traffic-signs";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b.*?<header\b[^>]*>(.*?)</header>").unwrap());
static BOLD_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<b\b[^>]*>\s*([\d,]+)\s*</b>").unwrap());
static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class\s*=\s*"[^"]*\bfeatured__item\b"#).unwrap());
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>").unwrap());

/// One parsed listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingPage {
    /// 1-based index of the first result on this page.
    pub first: usize,
    /// 1-based index of the last result on this page.
    pub last: usize,
    pub total: usize,
    pub records: Vec<PartialRecord>,
}

impl ListingPage {
    pub fn per_page(&self) -> usize {
        (self.last + 1).saturating_sub(self.first)
    }

    /// Number of pages needed to cover `total` results.
    pub fn page_count(&self) -> usize {
        match self.per_page() {
            0 => 0,
            per_page => self.total.div_ceil(per_page),
        }
    }
}

pub fn parse_listing(html: &str, origin: &str) -> Result<ListingPage, SourceError> {
    let header = HEADER_RE
        .captures(html)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
        .ok_or_else(|| SourceError::Parse("listing has no <main> header".into()))?;

    let numbers: Vec<usize> = BOLD_NUMBER_RE
        .captures_iter(header)
        .filter_map(|caps| caps[1].replace(',', "").parse().ok())
        .collect();
    let &[first, last, total] = numbers.as_slice() else {
        return Err(SourceError::Parse(format!(
            "expected 3 result counts in listing header, found {}",
            numbers.len()
        )));
    };

    let records = html::blocks(html, &ITEM_RE)
        .into_iter()
        .flat_map(|block| parse_item(block, origin))
        .collect();

    Ok(ListingPage {
        first,
        last,
        total,
        records,
    })
}

/// Split a heading into `(code, variant, title)`.
///
/// `"R2-4(l) No left turn"` → `("R2-4", "L", "No left turn")`. The code is
/// still raw; the variant is whatever sits in the first parentheses.
pub fn split_heading(heading: &str) -> Option<(&str, String, &str)> {
    let heading = heading.trim();
    let (full_code, title) = heading.split_once(' ').unwrap_or((heading, ""));
    if full_code.is_empty() {
        return None;
    }
    let (code, variant) = match full_code.split_once('(') {
        Some((code, rest)) => (code, strip_label_punctuation(rest).to_uppercase()),
        None => (full_code, String::new()),
    };
    Some((code, variant, title.trim()))
}

fn parse_item(block: &str, origin: &str) -> Vec<PartialRecord> {
    let Some(heading) = HEADING_RE.captures(block).map(|caps| caps[1].to_string()) else {
        warn!("featured item without a heading, skipping");
        return Vec::new();
    };
    let text = html::text(&heading);
    let Some((code, variant, title)) = split_heading(&text) else {
        warn!(heading = %text, "featured item without a sign code, skipping");
        return Vec::new();
    };
    let Some(src) = html::first_img_src(block) else {
        warn!(heading = %text, "featured item without an image, skipping");
        return Vec::new();
    };

    let docs = html::first_link(&heading).map(|(href, _)| html::absolute(origin, &href));
    let image = html::absolute(origin, &src);

    split_sign_codes(code)
        .into_iter()
        .map(|code| {
            PartialRecord::new(
                COUNTRY,
                code,
                SignRecord {
                    name: Some(title.to_string()).filter(|t| !t.is_empty()),
                    docs: docs.clone(),
                    urls: [(variant.clone(), image.clone())].into(),
                    placeholders: None,
                },
            )
        })
        .collect()
}

#[cfg(feature = "http")]
pub async fn fetch(
    client: &crate::HttpClient,
) -> Result<roadsigns_core::PartialDatabase, SourceError> {
    use crate::pages::{Combine, Pages};

    // Page 0 carries the result count.
    let first = fetch_page(client, 0).await?;
    let page_count = first.page_count();
    tracing::info!(page_count, total = first.total, "fetched TfNSW listing header");

    let mut pages = Pages::new("tfnsw", Combine::Fill);
    pages.add(0, Ok(first.records));
    for page in 1..page_count {
        tracing::info!(page, page_count, "fetching TfNSW listing page");
        let result = fetch_page(client, page).await.map(|listing| listing.records);
        pages.add(page, result);
    }
    Ok(pages.finish())
}

#[cfg(feature = "http")]
async fn fetch_page(client: &crate::HttpClient, page: usize) -> Result<ListingPage, SourceError> {
    let page_param = page.to_string();
    let html = client
        .get_text(LISTING_URL, &[("page", page_param.as_str())])
        .await?;
    parse_listing(&html, ORIGIN)
}
