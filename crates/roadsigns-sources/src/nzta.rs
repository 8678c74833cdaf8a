//! Waka Kotahi (NZTA) sign specifications (New Zealand).
//!
//! The catalogue is split into categories; each category is paged with a
//! `start` offset and renders a `trafficsigns` table, one row per sign
//! variant.

use std::sync::LazyLock;

use regex::Regex;
use roadsigns_core::{PartialRecord, SignRecord, split_sign_codes, strip_label_punctuation};
use tracing::warn;

use crate::SourceError;
use crate::html;

pub const COUNTRY: &str = "NZ";
pub const ORIGIN: &str = "https://www.nzta.govt.nz";
pub const LISTING_URL: &str =
    "https://www.nzta.govt.nz/resources/traffic-control-devices-manual/sign-specifications";

static CATEGORY_SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<select\b[^>]*\bid\s*=\s*"signage__filter--category"[^>]*>(.*?)</select>"#)
        .unwrap()
});
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<option\b[^>]*\bvalue\s*=\s*"([^"]*)"[^>]*>(.*?)</option>"#).unwrap()
});
static PER_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Displaying 1 - (\d+) results of").unwrap());
static TABLE_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?is)<table\b[^>]*\bclass\s*=\s*"[^"]*\btrafficsigns\b[^"]*"[^>]*>"#,
        r".*?<tbody\b[^>]*>(.*?)</tbody>",
    ))
    .unwrap()
});
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").unwrap());

/// A catalogue category as offered by the filter drop-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub total: usize,
}

/// Categories with at least one sign, plus the page size of the listing.
pub fn parse_categories(html: &str) -> Result<(Vec<Category>, usize), SourceError> {
    let select = CATEGORY_SELECT_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| SourceError::Parse("category filter not found".into()))?;

    let categories = OPTION_RE
        .captures_iter(select.as_str())
        .filter_map(|caps| {
            let label = html::text(&caps[2]);
            let total = label
                .split_once('(')
                .and_then(|(_, rest)| rest.split_once(')'))
                .and_then(|(n, _)| n.trim().parse().ok())
                .unwrap_or(0);
            (total > 0).then(|| Category {
                id: html::decode_entities(&caps[1]),
                label,
                total,
            })
        })
        .collect();

    let per_page = PER_PAGE_RE
        .captures(html)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|&n: &usize| n > 0)
        .ok_or_else(|| SourceError::Parse("result page size not found".into()))?;

    Ok((categories, per_page))
}

/// Rows of one results page. Rows coded `none` or without an image are
/// skipped.
pub fn parse_rows(html: &str) -> Vec<PartialRecord> {
    let Some(body) = TABLE_BODY_RE.captures(html).and_then(|caps| caps.get(1)) else {
        warn!("results table not found");
        return Vec::new();
    };
    ROW_RE
        .captures_iter(body.as_str())
        .flat_map(|caps| parse_row(caps.get(1).map_or("", |m| m.as_str())))
        .collect()
}

fn parse_row(row: &str) -> Vec<PartialRecord> {
    let cells = html::cells(row);
    let Some(code) = cells
        .iter()
        .find(|(attrs, _)| attrs.contains("rule-col"))
        .map(|(_, inner)| html::text(inner))
    else {
        warn!("sign row without a code cell, skipping");
        return Vec::new();
    };
    if code.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    let Some(src) = html::first_img_src(row) else {
        return Vec::new();
    };

    let variant = cells
        .get(2)
        .map(|(_, inner)| strip_label_punctuation(&html::text(inner)).to_uppercase())
        .unwrap_or_default();
    let (docs, name) = cells
        .get(4)
        .and_then(|(_, inner)| html::first_link(inner))
        .map(|(href, title)| (Some(html::absolute(ORIGIN, &href)), Some(title)))
        .unwrap_or((None, None));
    let image = html::absolute(ORIGIN, &src);

    split_sign_codes(&code)
        .into_iter()
        .map(|code| {
            PartialRecord::new(
                COUNTRY,
                code,
                SignRecord {
                    name: name.clone().filter(|n| !n.is_empty()),
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

    let index = client.get_text(LISTING_URL, &[("term", "a")]).await?;
    let (categories, per_page) = parse_categories(&index)?;
    tracing::info!(categories = categories.len(), per_page, "fetched NZTA categories");

    let mut pages = Pages::new("nzta", Combine::Fill);
    for category in &categories {
        for start in (0..category.total).step_by(per_page) {
            tracing::info!(
                category = %category.label,
                first = start,
                last = start + per_page - 1,
                "fetching NZTA results page"
            );
            let result = fetch_rows(client, &category.id, start).await;
            pages.add(format!("{}@{start}", category.label), result);
        }
    }
    Ok(pages.finish())
}

#[cfg(feature = "http")]
async fn fetch_rows(
    client: &crate::HttpClient,
    category: &str,
    start: usize,
) -> Result<Vec<PartialRecord>, SourceError> {
    let offset = start.to_string();
    let html = client
        .get_text(LISTING_URL, &[("category", category), ("start", offset.as_str())])
        .await?;
    Ok(parse_rows(&html))
}
