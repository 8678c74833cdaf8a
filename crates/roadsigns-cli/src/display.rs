//! Text rendering for saved sign records.

use std::collections::BTreeMap;
use std::fmt::Write;

use roadsigns_core::{Placeholder, SignRecord};

const DEFAULT_VARIANT: &str = "(default)";

/// A single record as a vertical card.
pub fn render_card(country: &str, code: &str, record: &SignRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {country} {code} ===");
    if let Some(name) = record.name.as_deref().filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "{name}");
    }
    out.push('\n');

    if let Some(docs) = record.docs.as_deref() {
        let _ = writeln!(out, "Documentation");
        let _ = writeln!(out, "  {docs}");
    }

    if !record.urls.is_empty() {
        let _ = writeln!(out, "Variants");
        for (label, url) in &record.urls {
            let label = if label.is_empty() { DEFAULT_VARIANT } else { label };
            let _ = writeln!(out, "  {:<16} {}", label, url);
        }
    }

    if let Some(placeholders) = &record.placeholders {
        let _ = writeln!(out, "Placeholders");
        for (index, slot) in placeholders.iter().enumerate() {
            match slot {
                Some(p) => {
                    let _ = writeln!(out, "  [{index}] {}", describe_placeholder(p));
                }
                None => {
                    let _ = writeln!(out, "  [{index}] -");
                }
            }
        }
    }

    out
}

fn describe_placeholder(p: &Placeholder) -> String {
    let mut line = format!(
        "{} at ({}, {}) size {}x{}",
        p.dom_id,
        number(p.x),
        number(p.y),
        number(p.width),
        number(p.height)
    );
    if let Some(kind) = &p.kind {
        let _ = write!(line, " type={kind}");
    }
    if let Some(font) = &p.font {
        let _ = write!(line, " font={font}");
    }
    if let Some(example) = &p.example {
        let _ = write!(line, " example={example:?}");
    }
    line
}

fn number(value: Option<f64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

/// One line per sign: code, variant count, name.
pub fn render_country(country: &str, signs: &BTreeMap<String, SignRecord>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {country} ({} signs) ===", signs.len());
    for (code, record) in signs {
        let _ = writeln!(
            out,
            "  {:<14} {:>2} variant(s)  {}",
            code,
            record.urls.len(),
            record.name.as_deref().unwrap_or("")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SignRecord {
        SignRecord {
            name: Some("Give Way".into()),
            docs: Some("https://example.com/r1-2".into()),
            urls: BTreeMap::from([
                (String::new(), "https://example.com/r1-2.svg".to_string()),
                ("LARGE".to_string(), "https://example.com/r1-2-large.svg".to_string()),
            ]),
            placeholders: Some(vec![
                None,
                Some(Placeholder {
                    dom_id: "distance".into(),
                    x: Some(12.5),
                    y: Some(40.0),
                    width: Some(75.0),
                    height: None,
                    font: None,
                    example: Some("200 m".into()),
                    kind: None,
                }),
            ]),
        }
    }

    #[test]
    fn card_sections() {
        let card = render_card("AU", "R1-2", &record());
        assert!(card.starts_with("=== AU R1-2 ===\nGive Way\n"));
        assert!(card.contains("Documentation\n  https://example.com/r1-2\n"));
        assert!(card.contains("  (default)        https://example.com/r1-2.svg\n"));
        assert!(card.contains("  LARGE            https://example.com/r1-2-large.svg\n"));
        assert!(card.contains("  [0] -\n"));
        assert!(card.contains("  [1] distance at (12.5, 40) size 75x? example=\"200 m\"\n"));
    }

    #[test]
    fn card_skips_empty_sections() {
        let card = render_card("NZ", "PW-1", &SignRecord::default());
        assert_eq!(card, "=== NZ PW-1 ===\n\n");
    }

    #[test]
    fn country_listing() {
        let signs = BTreeMap::from([("R1-2".to_string(), record())]);
        let text = render_country("AU", &signs);
        assert!(text.starts_with("=== AU (1 signs) ===\n"));
        assert!(text.contains("R1-2"));
        assert!(text.contains(" 2 variant(s)  Give Way"));
    }
}
