//! Sign registry data model shared by adapters, the merge engine, and the store.
//!
//! The persisted layout is a single JSON object:
//! `country → sign code → { name, docs, urls, placeholders }`.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// One overlay region on a sign image (dynamic text or graphics).
///
/// Coordinates are `None` when the source omitted the qualifier; they
/// serialise as `null` so the slot stays visible to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placeholder {
    #[serde(rename = "domId")]
    pub dom_id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Everything known about one sign code in one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
    /// Variant label → image URL. `""` is the default variant.
    #[serde(default)]
    pub urls: BTreeMap<String, String>,
    /// Index-significant; `None` entries are holes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholders: Option<Vec<Option<Placeholder>>>,
}

impl SignRecord {
    /// A record carrying only image URLs.
    pub fn with_urls(urls: BTreeMap<String, String>) -> Self {
        Self {
            urls,
            ..Self::default()
        }
    }
}

/// One adapter output unit: a partial record for a single (country, code).
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRecord {
    pub country: String,
    pub code: String,
    pub fields: SignRecord,
}

impl PartialRecord {
    pub fn new(country: impl Into<String>, code: impl Into<String>, fields: SignRecord) -> Self {
        Self {
            country: country.into(),
            code: code.into(),
            fields,
        }
    }
}

/// Country code → sign code → record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    countries: BTreeMap<String, BTreeMap<String, SignRecord>>,
}

/// One source's incomplete contribution. Same shape as the final database.
pub type PartialDatabase = Database;

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, country: &str, code: &str) -> Option<&SignRecord> {
        self.countries.get(country)?.get(code)
    }

    /// Replace whatever is stored at (country, code).
    pub fn insert(
        &mut self,
        country: impl Into<String>,
        code: impl Into<String>,
        record: SignRecord,
    ) -> Option<SignRecord> {
        self.countries
            .entry(country.into())
            .or_default()
            .insert(code.into(), record)
    }

    /// Mutable access to the record at (country, code), creating an empty
    /// one if absent. The flag is `true` when the record was just created.
    pub fn record_mut(&mut self, country: &str, code: &str) -> (&mut SignRecord, bool) {
        let signs = self.countries.entry(country.to_string()).or_default();
        match signs.entry(code.to_string()) {
            btree_map::Entry::Occupied(e) => (e.into_mut(), false),
            btree_map::Entry::Vacant(e) => (e.insert(SignRecord::default()), true),
        }
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn signs(&self, country: &str) -> Option<&BTreeMap<String, SignRecord>> {
        self.countries.get(country)
    }

    /// Iterate `(country, code, record)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &SignRecord)> {
        self.countries.iter().flat_map(|(country, signs)| {
            signs
                .iter()
                .map(move |(code, record)| (country.as_str(), code.as_str(), record))
        })
    }

    pub fn country_count(&self) -> usize {
        self.countries.len()
    }

    pub fn sign_count(&self) -> usize {
        self.countries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sign_count() == 0
    }

    /// Accumulate a record inside one adapter run: the first non-empty
    /// value for each field or URL variant is kept.
    pub fn push_partial(&mut self, record: PartialRecord) {
        let PartialRecord {
            country,
            code,
            fields,
        } = record;
        let (existing, _) = self.record_mut(&country, &code);
        fill_record(existing, fields);
    }

    pub fn from_records(records: impl IntoIterator<Item = PartialRecord>) -> Self {
        let mut db = Self::new();
        for record in records {
            db.push_partial(record);
        }
        db
    }
}

impl IntoIterator for Database {
    type Item = (String, BTreeMap<String, SignRecord>);
    type IntoIter = btree_map::IntoIter<String, BTreeMap<String, SignRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.countries.into_iter()
    }
}

/// Counts of what [`fill_record`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FillOutcome {
    pub fields: usize,
    pub urls: usize,
}

pub(crate) fn is_unset(value: Option<&str>) -> bool {
    value.is_none_or(str::is_empty)
}

/// Fill only the fields and URL variants `target` does not have yet.
pub(crate) fn fill_record(target: &mut SignRecord, incoming: SignRecord) -> FillOutcome {
    let mut outcome = FillOutcome::default();

    if is_unset(target.name.as_deref()) && incoming.name.is_some() {
        target.name = incoming.name;
        outcome.fields += 1;
    }
    if is_unset(target.docs.as_deref()) && incoming.docs.is_some() {
        target.docs = incoming.docs;
        outcome.fields += 1;
    }
    for (label, url) in incoming.urls {
        if target.urls.get(&label).is_none_or(String::is_empty) {
            target.urls.insert(label, url);
            outcome.urls += 1;
        }
    }
    if target.placeholders.is_none() && incoming.placeholders.is_some() {
        target.placeholders = incoming.placeholders;
        outcome.fields += 1;
    }

    outcome
}

fn is_label_punctuation(c: char) -> bool {
    matches!(c, '(' | ')' | '_')
}

/// Trim leading/trailing parentheses and underscores.
pub fn strip_label_punctuation(s: &str) -> &str {
    s.trim_matches(is_label_punctuation)
}

/// Canonicalise a raw code cell into one code per sub-code.
///
/// `"r1-1/r1-2"` → `["R1-1", "R1-2"]`, `"(W5-1)"` → `["W5-1"]`.
pub fn split_sign_codes(raw: &str) -> Vec<String> {
    raw.split('/')
        .map(|part| strip_label_punctuation(part.trim()).trim().to_uppercase())
        .filter(|code| !code.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_single_code() {
        assert_eq!(split_sign_codes("r1-1"), vec!["R1-1"]);
    }

    #[test]
    fn split_multi_code() {
        assert_eq!(split_sign_codes("R1-1/R1-2A"), vec!["R1-1", "R1-2A"]);
    }

    #[test]
    fn split_strips_enclosing_punctuation() {
        assert_eq!(split_sign_codes("(W5-1)"), vec!["W5-1"]);
        assert_eq!(split_sign_codes("_123_ / (b)"), vec!["123", "B"]);
    }

    #[test]
    fn split_drops_empty_parts() {
        assert!(split_sign_codes("").is_empty());
        assert_eq!(split_sign_codes("A//B"), vec!["A", "B"]);
        assert!(split_sign_codes("()").is_empty());
    }

    #[test]
    fn strip_punctuation_keeps_inner() {
        assert_eq!(strip_label_punctuation("__a_(b)__"), "a_(b");
        assert_eq!(strip_label_punctuation("()_"), "");
    }

    #[test]
    fn push_partial_keeps_first_non_empty() {
        let mut db = Database::new();
        db.push_partial(PartialRecord::new(
            "AU",
            "R1-1",
            SignRecord {
                name: Some(String::new()),
                urls: urls(&[("", "u1")]),
                ..SignRecord::default()
            },
        ));
        db.push_partial(PartialRecord::new(
            "AU",
            "R1-1",
            SignRecord {
                name: Some("Stop".into()),
                docs: Some("d".into()),
                urls: urls(&[("", "u2"), ("B", "u3")]),
                ..SignRecord::default()
            },
        ));

        let record = db.get("AU", "R1-1").unwrap();
        assert_eq!(record.name.as_deref(), Some("Stop"));
        assert_eq!(record.docs.as_deref(), Some("d"));
        assert_eq!(record.urls, urls(&[("", "u1"), ("B", "u3")]));
    }

    #[test]
    fn counts_and_iteration() {
        let db = Database::from_records([
            PartialRecord::new("NZ", "R1-2", SignRecord::default()),
            PartialRecord::new("AU", "R1-1", SignRecord::default()),
            PartialRecord::new("AU", "R1-2", SignRecord::default()),
        ]);
        assert_eq!(db.country_count(), 2);
        assert_eq!(db.countries().collect::<Vec<_>>(), vec!["AU", "NZ"]);
        assert_eq!(db.sign_count(), 3);
        let keys: Vec<_> = db.iter().map(|(c, s, _)| format!("{c}/{s}")).collect();
        assert_eq!(keys, vec!["AU/R1-1", "AU/R1-2", "NZ/R1-2"]);
    }

    #[test]
    fn record_json_omits_unset_fields() {
        let record = SignRecord::with_urls(urls(&[("", "u")]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({ "urls": { "": "u" } }));
    }

    #[test]
    fn database_json_layout() {
        let json = r#"{
            "AU": {
                "R1-1": {
                    "name": "Give Way",
                    "docs": null,
                    "urls": { "": "https://example.com/r1-1.svg" },
                    "placeholders": [
                        null,
                        { "domId": "t1", "x": 1, "y": 2, "width": 30.5, "height": null, "font": "Q1" }
                    ]
                },
                "R1-2": { "urls": {} }
            }
        }"#;
        let db: Database = serde_json::from_str(json).unwrap();
        let record = db.get("AU", "R1-1").unwrap();
        assert_eq!(record.name.as_deref(), Some("Give Way"));
        assert!(record.docs.is_none());

        let placeholders = record.placeholders.as_ref().unwrap();
        assert!(placeholders[0].is_none());
        let slot = placeholders[1].as_ref().unwrap();
        assert_eq!(slot.dom_id, "t1");
        assert_eq!(slot.width, Some(30.5));
        assert_eq!(slot.height, None);
        assert_eq!(slot.font.as_deref(), Some("Q1"));

        assert!(db.get("AU", "R1-2").unwrap().urls.is_empty());
    }

    #[test]
    fn missing_urls_defaults_to_empty() {
        let db: Database = serde_json::from_str(r#"{"AU":{"X":{"docs":"d"}}}"#).unwrap();
        assert!(db.get("AU", "X").unwrap().urls.is_empty());
    }
}
