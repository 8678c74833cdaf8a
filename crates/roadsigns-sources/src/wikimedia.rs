//! Wikipedia "Road signs in ..." articles.
//!
//! Each configured article is fetched as raw wiki markup and scanned with a
//! per-country pattern whose named groups `image` and `code` pick out a
//! gallery line's file name and sign code. All images for one code become
//! that code's URL variants, keyed by [`normalize_labels`].

use std::collections::BTreeMap;

use regex::Regex;
use roadsigns_core::{
    PartialDatabase, PartialRecord, SignRecord, WikiPage, label_collisions, normalize_labels,
    split_sign_codes,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::SourceError;

pub const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const FILE_PATH_URL: &str = "https://en.wikipedia.org/wiki/Special:FilePath/File:";

/// A configured article with its compiled pattern.
#[derive(Debug, Clone)]
pub struct CompiledPage {
    pub country: String,
    pub page: String,
    pub pattern: Regex,
}

pub fn compile_pages(pages: &[WikiPage]) -> Result<Vec<CompiledPage>, SourceError> {
    pages.iter().map(compile_page).collect()
}

pub fn compile_page(page: &WikiPage) -> Result<CompiledPage, SourceError> {
    let pattern = Regex::new(&page.pattern).map_err(|source| SourceError::Pattern {
        page: page.page.clone(),
        source,
    })?;
    let names: Vec<&str> = pattern.capture_names().flatten().collect();
    if !names.contains(&"image") || !names.contains(&"code") {
        return Err(SourceError::Parse(format!(
            "pattern for {:?} must define `image` and `code` groups",
            page.page
        )));
    }
    Ok(CompiledPage {
        country: page.country.clone(),
        page: page.page.clone(),
        pattern,
    })
}

/// Stable URL for a Commons file that redirects to the current original.
///
/// `"File:MUTCD R1-1.svg"` → `https://en.wikipedia.org/wiki/Special:FilePath/File:MUTCD_R1-1.svg`
pub fn commons_file_url(file_name: &str) -> String {
    let base = file_name.trim();
    let base = base.strip_prefix("File:").unwrap_or(base);
    format!("{FILE_PATH_URL}{}", base.replace(' ', "_"))
}

/// Group every image URL in `markup` under each sub-code it is listed for.
pub fn parse_wiki_page(markup: &str, pattern: &Regex) -> BTreeMap<String, Vec<String>> {
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for caps in pattern.captures_iter(markup) {
        let (Some(image), Some(code)) = (caps.name("image"), caps.name("code")) else {
            continue;
        };
        let codes = split_sign_codes(code.as_str());
        if codes.is_empty() {
            warn!(line = &caps[0], "gallery line without a sign code, skipping");
            continue;
        }
        let url = commons_file_url(image.as_str());
        for code in codes {
            out.entry(code).or_default().push(url.clone());
        }
    }
    out
}

/// Turn one article into partial records: name and docs stay unset.
pub fn page_records(country: &str, markup: &str, pattern: &Regex) -> Vec<PartialRecord> {
    parse_wiki_page(markup, pattern)
        .into_iter()
        .map(|(code, urls)| {
            let collisions = label_collisions(&urls);
            if collisions > 0 {
                debug!(country, code = %code, collisions, "variant labels collided");
            }
            PartialRecord::new(country, code, SignRecord::with_urls(normalize_labels(&urls)))
        })
        .collect()
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Query,
}

#[derive(Deserialize)]
struct Query {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    revisions: Vec<Revision>,
}

#[derive(Deserialize)]
struct Revision {
    slots: Slots,
}

#[derive(Deserialize)]
struct Slots {
    main: MainSlot,
}

#[derive(Deserialize)]
struct MainSlot {
    content: String,
}

/// Extract `title → markup` from a `prop=revisions` API response
/// (`formatversion=2`). Missing pages are left out.
pub fn parse_revisions(body: &str) -> Result<BTreeMap<String, String>, SourceError> {
    let response: QueryResponse = serde_json::from_str(body)?;
    Ok(response
        .query
        .pages
        .into_iter()
        .filter_map(|page| {
            let revision = page.revisions.into_iter().next()?;
            Some((page.title, revision.slots.main.content))
        })
        .collect())
}

/// Build the partial database from already fetched articles.
pub fn records_from_pages(
    pages: &[CompiledPage],
    markup: &BTreeMap<String, String>,
) -> PartialDatabase {
    let mut db = PartialDatabase::new();
    for page in pages {
        let Some(content) = markup.get(&page.page) else {
            warn!(page = %page.page, "article missing from API response, skipping");
            continue;
        };
        let records = page_records(&page.country, content, &page.pattern);
        debug!(page = %page.page, codes = records.len(), "parsed article");
        for record in records {
            db.push_partial(record);
        }
    }
    db
}

#[cfg(feature = "http")]
pub async fn fetch(
    client: &crate::HttpClient,
    pages: &[WikiPage],
) -> Result<PartialDatabase, SourceError> {
    let pages = compile_pages(pages)?;
    if pages.is_empty() {
        return Ok(PartialDatabase::new());
    }

    let titles = pages
        .iter()
        .map(|p| p.page.replace(' ', "_"))
        .collect::<Vec<_>>()
        .join("|");
    tracing::info!(pages = pages.len(), "fetching Wikipedia articles");
    let body = client
        .get_text(
            API_URL,
            &[
                ("action", "query"),
                ("format", "json"),
                ("prop", "revisions"),
                ("titles", titles.as_str()),
                ("formatversion", "2"),
                ("rvprop", "content"),
                ("rvslots", "*"),
            ],
        )
        .await?;

    let markup = parse_revisions(&body)?;
    let db = records_from_pages(&pages, &markup);
    tracing::info!(signs = db.sign_count(), "parsed Wikipedia articles");
    Ok(db)
}

#[cfg(test)]
mod tests {
    use roadsigns_core::config::default_wiki_pages;

    use super::*;

    fn pattern(country: &str) -> Regex {
        let page = default_wiki_pages()
            .into_iter()
            .find(|p| p.country == country)
            .unwrap();
        compile_page(&page).unwrap().pattern
    }

    #[test]
    fn default_patterns_compile() {
        assert_eq!(compile_pages(&default_wiki_pages()).unwrap().len(), 5);
    }

    #[test]
    fn pattern_without_groups_rejected() {
        let page = WikiPage {
            country: "FR".into(),
            page: "Road signs in France".into(),
            pattern: r"File:(.+)".into(),
        };
        assert!(matches!(compile_page(&page), Err(SourceError::Parse(_))));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let page = WikiPage {
            country: "FR".into(),
            page: "Road signs in France".into(),
            pattern: r"(?<image>".into(),
        };
        assert!(matches!(compile_page(&page), Err(SourceError::Pattern { .. })));
    }

    #[test]
    fn commons_url() {
        assert_eq!(
            commons_file_url("File:Australia road sign R1-1.svg"),
            "https://en.wikipedia.org/wiki/Special:FilePath/File:Australia_road_sign_R1-1.svg"
        );
    }

    #[test]
    fn australian_gallery() {
        let markup = "\
<gallery>
File:Australia road sign R1-1.svg|(R1-1) Stop
File:Australia road sign R1-2.svg|(R1-2) Give way
File:Australia road sign R2-4 (L).svg|(R2-4) No left turn
File:Australia road sign R2-4 (R).svg|(R2-4) No right turn
</gallery>";
        let parsed = parse_wiki_page(markup, &pattern("AU"));
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed["R2-4"].len(), 2);

        let records = page_records("AU", markup, &pattern("AU"));
        let r2_4 = records.iter().find(|r| r.code == "R2-4").unwrap();
        assert_eq!(
            r2_4.fields.urls.keys().collect::<Vec<_>>(),
            vec!["L", "R"]
        );
        let r1_1 = records.iter().find(|r| r.code == "R1-1").unwrap();
        assert_eq!(
            r1_1.fields.urls[""],
            "https://en.wikipedia.org/wiki/Special:FilePath/File:Australia_road_sign_R1-1.svg"
        );
        assert!(r1_1.fields.name.is_none());
    }

    #[test]
    fn german_gallery_with_shared_image() {
        let markup = "File:Zeichen 205.svg|'''Sign 205/206''' Give way\n\
            File:Zeichen 274-60.svg|'''Sign 274''' Speed limit";
        let parsed = parse_wiki_page(markup, &pattern("DE"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["205", "206", "274"]);
        assert_eq!(parsed["205"], parsed["206"]);
    }

    #[test]
    fn new_zealand_linked_code() {
        let markup = "File:New Zealand PW-10.svg|([https://www.nzta.govt.nz/x PW-10]) Road narrows\n\
            File:New Zealand R1-1.svg|(r1-1) Stop";
        let parsed = parse_wiki_page(markup, &pattern("NZ"));
        assert!(parsed.contains_key("PW-10"));
        assert!(parsed.contains_key("R1-1"));
    }

    #[test]
    fn united_states_file_names() {
        let markup = "File:MUTCD R1-1.svg|Stop\n\
            File:MUTCD W1-1L.svg|Turn\n\
            File:MUTCD W1-1R.svg|Turn";
        let parsed = parse_wiki_page(markup, &pattern("US"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["R1-1", "W1-1L", "W1-1R"]);
    }

    #[test]
    fn netherlands_codes() {
        let markup = "File:Nederlands verkeersbord A1-30.svg|A1: Maximum speed\n\
            File:Nederlands verkeersbord B6.svg|B6: Stop";
        let parsed = parse_wiki_page(markup, &pattern("NL"));
        assert_eq!(parsed.keys().collect::<Vec<_>>(), vec!["A1", "B6"]);
    }

    #[test]
    fn revisions_response() {
        let body = r#"{
            "batchcomplete": true,
            "query": {
                "pages": [
                    { "pageid": 1, "title": "Road signs in Australia",
                      "revisions": [ { "slots": { "main": { "contentmodel": "wikitext", "content": "File:A.svg|(R1-1) Stop" } } } ] },
                    { "title": "Road signs in Atlantis", "missing": true }
                ]
            }
        }"#;
        let pages = parse_revisions(body).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages["Road signs in Australia"], "File:A.svg|(R1-1) Stop");
    }

    #[test]
    fn records_skip_missing_articles() {
        let pages = compile_pages(&default_wiki_pages()).unwrap();
        let markup = BTreeMap::from([(
            "Road signs in Australia".to_string(),
            "File:A.svg|(R1-1) Stop\nFile:B.svg|(R1-2) Give way".to_string(),
        )]);
        let db = records_from_pages(&pages, &markup);
        assert_eq!(db.country_count(), 1);
        assert_eq!(db.sign_count(), 2);
    }
}
