//! Tolerant HTML helpers for the listing scrapers.
//!
//! The listing pages are small and regular, so extraction scans known
//! blocks with a handful of regexes instead of building a DOM.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#).unwrap()
});
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']*)["']"#).unwrap());
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td\b([^>]*)>(.*?)</td>").unwrap());

/// Tag-free, entity-decoded, whitespace-collapsed text content.
pub fn text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// First link in `fragment`: `(href, link text)`.
pub fn first_link(fragment: &str) -> Option<(String, String)> {
    HREF_RE
        .captures(fragment)
        .map(|caps| (decode_entities(&caps[1]), text(&caps[2])))
}

pub fn first_img_src(fragment: &str) -> Option<String> {
    IMG_SRC_RE
        .captures(fragment)
        .map(|caps| decode_entities(&caps[1]))
        .filter(|src| !src.is_empty())
}

/// `<td>` cells of a table row: `(attributes, inner html)`.
pub fn cells(row: &str) -> Vec<(&str, &str)> {
    CELL_RE
        .captures_iter(row)
        .filter_map(|caps| Some((caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .collect()
}

/// Resolve a possibly relative link against a site origin.
pub fn absolute(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), href)
    }
}

/// Split `html` into blocks, each starting at a match of `marker` and
/// running to the next match (or the end).
pub fn blocks<'a>(html: &'a str, marker: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = marker.find_iter(html).map(|m| m.start()).collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(html.len());
            &html[start..end]
        })
        .collect()
}
