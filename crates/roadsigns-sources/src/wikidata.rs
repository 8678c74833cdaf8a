//! Wikidata road sign items: the knowledge-base source.
//!
//! Items are found with a SPARQL query for instances of the sign class and
//! then fetched in chunks through `wbgetentities`. A record built here is
//! treated as ground truth and replaces whatever lower-precedence sources
//! produced for the same code.

use std::collections::{BTreeMap, HashMap};

use roadsigns_core::{
    PartialDatabase, PartialRecord, Placeholder, SignRecord, WikidataConfig, split_sign_codes,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::SourceError;
use crate::wikimedia::commons_file_url;

pub const SPARQL_URL: &str = "https://query.wikidata.org/sparql";
pub const ENTITIES_URL: &str = "https://www.wikidata.org/w/api.php";

/// Placeholder slots beyond this index are treated as bad data.
const MAX_PLACEHOLDER_INDEX: usize = 255;

mod prop {
    pub const INSTANCE_OF: &str = "P31";
    pub const COUNTRY: &str = "P17";
    pub const IMAGE: &str = "P18";
    pub const CATALOG_CODE: &str = "P528";
    pub const WEBSITE: &str = "P856";
    pub const INDEX: &str = "P1545";
    pub const X: &str = "P8684";
    pub const Y: &str = "P8685";
    pub const WIDTH: &str = "P2049";
    pub const HEIGHT: &str = "P2048";
    pub const FONT: &str = "P2739";
    pub const EXAMPLE: &str = "P5831";
    pub const VARIANT_CODE: &str = "P3295";
    pub const PLACEHOLDER: &str = "P9410";
}

pub fn sparql_query(sign_class: &str) -> String {
    format!("SELECT ?sign WHERE {{ ?sign wdt:P31 wd:{sign_class}; }}")
}

// ── Wire types ──

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

#[derive(Deserialize)]
struct SparqlBinding {
    sign: SparqlValue,
}

#[derive(Deserialize)]
struct SparqlValue {
    value: String,
}

#[derive(Debug, Deserialize)]
pub struct EntitiesResponse {
    #[serde(default)]
    pub entities: BTreeMap<String, Entity>,
}

#[derive(Debug, Deserialize)]
pub struct Entity {
    #[serde(default)]
    labels: BTreeMap<String, LangValue>,
    #[serde(default)]
    claims: HashMap<String, Vec<Statement>>,
}

#[derive(Debug, Deserialize)]
struct LangValue {
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Rank {
    Preferred,
    Normal,
    Deprecated,
}

#[derive(Debug, Deserialize)]
struct Statement {
    #[serde(default)]
    id: String,
    rank: Rank,
    mainsnak: Snak,
    #[serde(default)]
    qualifiers: HashMap<String, Vec<Snak>>,
}

#[derive(Debug, Deserialize)]
struct Snak {
    #[serde(default)]
    datatype: Option<String>,
    #[serde(default)]
    datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    #[serde(rename = "type")]
    kind: String,
    value: Value,
}

impl Snak {
    /// The raw value if both the property datatype and value type match.
    fn value(&self, datatype: &str, kind: &str) -> Option<&Value> {
        let data = self.datavalue.as_ref()?;
        (self.datatype.as_deref() == Some(datatype) && data.kind == kind).then_some(&data.value)
    }

    fn string(&self, datatype: &str) -> Option<&str> {
        self.value(datatype, "string")?.as_str()
    }

    fn item_id(&self) -> Option<&str> {
        self.value("wikibase-item", "wikibase-entityid")?
            .get("id")?
            .as_str()
    }

    fn quantity(&self) -> Option<f64> {
        self.value("quantity", "quantity")?
            .get("amount")?
            .as_str()?
            .parse()
            .ok()
    }

    fn monolingual_text(&self) -> Option<&str> {
        self.value("monolingualtext", "monolingualtext")?
            .get("text")?
            .as_str()
    }
}

impl Statement {
    fn qualifier(&self, property: &str) -> Option<&Snak> {
        self.qualifiers.get(property)?.first()
    }
}

impl Entity {
    fn statements(&self, property: &str) -> &[Statement] {
        self.claims.get(property).map(Vec::as_slice).unwrap_or_default()
    }

    /// English label if present, otherwise the first by language code.
    fn name(&self) -> Option<&str> {
        self.labels
            .get("en")
            .or_else(|| self.labels.values().next())
            .map(|label| label.value.as_str())
    }
}

/// Item ids (`Q123`) from a SPARQL JSON result.
pub fn parse_sparql_ids(body: &str) -> Result<Vec<String>, SourceError> {
    let response: SparqlResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .bindings
        .into_iter()
        .filter_map(|binding| {
            let id = binding.sign.value.rsplit('/').next()?.to_string();
            let valid = id.len() > 1
                && id.starts_with('Q')
                && id[1..].bytes().all(|b| b.is_ascii_digit());
            if !valid {
                warn!(value = %binding.sign.value, "unexpected SPARQL binding, skipping");
            }
            valid.then_some(id)
        })
        .collect())
}

/// Build the records for one item. Items without a usable catalogue code
/// or country are dropped with a warning.
pub fn entity_records(
    item_id: &str,
    entity: &Entity,
    config: &WikidataConfig,
) -> Vec<PartialRecord> {
    let Some(raw_code) = entity
        .statements(prop::CATALOG_CODE)
        .iter()
        .find(|s| s.rank != Rank::Deprecated)
        .and_then(|s| s.mainsnak.string("string"))
    else {
        warn!(item = item_id, "invalid sign code, skipping");
        return Vec::new();
    };

    let Some(country_item) = entity
        .statements(prop::COUNTRY)
        .first()
        .and_then(|s| s.mainsnak.item_id())
    else {
        warn!(item = item_id, "invalid country, skipping");
        return Vec::new();
    };
    let Some(country) = config
        .countries
        .get(country_item)
        .map(|iso| iso.trim().to_uppercase())
        .filter(|iso| !iso.is_empty())
    else {
        warn!(item = item_id, country = country_item, "unmapped country item, skipping");
        return Vec::new();
    };

    let fields = SignRecord {
        name: entity.name().map(str::to_string),
        docs: entity
            .statements(prop::WEBSITE)
            .first()
            .and_then(|s| s.mainsnak.string("url"))
            .map(str::to_string),
        urls: image_urls(entity),
        placeholders: placeholders(item_id, entity),
    };

    split_sign_codes(raw_code)
        .into_iter()
        .map(|code| PartialRecord::new(country.as_str(), code, fields.clone()))
        .collect()
}

/// Variant label → image URL. Deprecated images keep a `_` prefix so they
/// never shadow a current variant.
fn image_urls(entity: &Entity) -> BTreeMap<String, String> {
    let mut urls = BTreeMap::new();
    for statement in entity.statements(prop::IMAGE) {
        let Some(file) = statement.mainsnak.string("commonsMedia") else {
            continue;
        };
        let variant = statement
            .qualifier(prop::VARIANT_CODE)
            .and_then(|q| q.string("string"))
            .filter(|v| *v != "null")
            .unwrap_or("")
            .to_uppercase();
        let prefix = if statement.rank == Rank::Deprecated { "_" } else { "" };
        urls.insert(format!("{prefix}{variant}"), commons_file_url(file));
    }
    urls
}

fn placeholders(item_id: &str, entity: &Entity) -> Option<Vec<Option<Placeholder>>> {
    let mut slots: Option<Vec<Option<Placeholder>>> = None;

    for statement in entity.statements(prop::PLACEHOLDER) {
        let Some(dom_id) = statement.mainsnak.string("string") else {
            warn!(item = item_id, statement = %statement.id, "invalid placeholder domId");
            continue;
        };
        let Some(index) = statement
            .qualifier(prop::INDEX)
            .and_then(|q| q.string("string"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&i| i <= MAX_PLACEHOLDER_INDEX)
        else {
            warn!(item = item_id, statement = %statement.id, "invalid placeholder index");
            continue;
        };

        let quantity = |property| statement.qualifier(property).and_then(Snak::quantity);
        let placeholder = Placeholder {
            dom_id: dom_id.to_string(),
            x: quantity(prop::X),
            y: quantity(prop::Y),
            width: quantity(prop::WIDTH),
            height: quantity(prop::HEIGHT),
            font: statement
                .qualifier(prop::FONT)
                .and_then(Snak::item_id)
                .map(str::to_string),
            example: statement
                .qualifier(prop::EXAMPLE)
                .and_then(Snak::monolingual_text)
                .map(str::to_string),
            kind: statement
                .qualifier(prop::INSTANCE_OF)
                .and_then(Snak::item_id)
                .map(str::to_string),
        };

        let slots = slots.get_or_insert_with(Vec::new);
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        slots[index] = Some(placeholder);
    }

    slots
}

/// Records for every entity in a `wbgetentities` response. Later codes
/// replace earlier ones.
pub fn records_from_entities(
    response: &EntitiesResponse,
    config: &WikidataConfig,
) -> PartialDatabase {
    let mut db = PartialDatabase::new();
    for (item_id, entity) in &response.entities {
        for record in entity_records(item_id, entity, config) {
            db.insert(record.country, record.code, record.fields);
        }
    }
    db
}

#[cfg(feature = "http")]
pub async fn fetch(
    client: &crate::HttpClient,
    config: &WikidataConfig,
) -> Result<PartialDatabase, SourceError> {
    use futures::StreamExt;

    use crate::pages::{Combine, Pages};

    tracing::info!("fetching Wikidata sign index");
    let query = sparql_query(&config.sign_class);
    let body = client
        .get_text(SPARQL_URL, &[("query", query.as_str()), ("format", "json")])
        .await?;
    let ids = parse_sparql_ids(&body)?;
    tracing::info!(items = ids.len(), "fetched Wikidata sign index");

    let chunks: Vec<String> = ids
        .chunks(config.chunk_size.max(1))
        .map(|chunk| chunk.join("|"))
        .collect();
    let responses: Vec<Result<EntitiesResponse, SourceError>> = futures::stream::iter(chunks)
        .map(|ids| async move {
            tracing::debug!(ids = ids.matches('|').count() + 1, "fetching Wikidata entities");
            client
                .get_json::<EntitiesResponse>(
                    ENTITIES_URL,
                    &[
                        ("action", "wbgetentities"),
                        ("ids", ids.as_str()),
                        ("format", "json"),
                    ],
                )
                .await
        })
        .buffered(4)
        .collect()
        .await;

    let mut pages = Pages::new("wikidata", Combine::Replace);
    for (chunk, result) in responses.into_iter().enumerate() {
        let records = result.map(|response| {
            response
                .entities
                .iter()
                .flat_map(|(item_id, entity)| entity_records(item_id, entity, config))
                .collect()
        });
        pages.add(format!("chunk {chunk}"), records);
    }
    Ok(pages.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTITIES: &str = r#"{
      "entities": {
        "Q1001": {
          "id": "Q1001",
          "labels": {
            "de": { "language": "de", "value": "Vorfahrt achten" },
            "en": { "language": "en", "value": "Give way" }
          },
          "claims": {
            "P17": [ { "id": "s1", "rank": "normal", "mainsnak": {
              "datatype": "wikibase-item",
              "datavalue": { "type": "wikibase-entityid", "value": { "entity-type": "item", "numeric-id": 408, "id": "Q408" } } } } ],
            "P528": [
              { "id": "s2", "rank": "deprecated", "mainsnak": { "datatype": "string", "datavalue": { "type": "string", "value": "OLD-1" } } },
              { "id": "s3", "rank": "normal", "mainsnak": { "datatype": "string", "datavalue": { "type": "string", "value": "r1-2" } } }
            ],
            "P18": [
              { "id": "s4", "rank": "normal", "mainsnak": { "datatype": "commonsMedia", "datavalue": { "type": "string", "value": "Australia road sign R1-2.svg" } } },
              { "id": "s5", "rank": "normal",
                "mainsnak": { "datatype": "commonsMedia", "datavalue": { "type": "string", "value": "Australia road sign R1-2 large.svg" } },
                "qualifiers": { "P3295": [ { "datatype": "string", "datavalue": { "type": "string", "value": "large" } } ] } },
              { "id": "s6", "rank": "deprecated",
                "mainsnak": { "datatype": "commonsMedia", "datavalue": { "type": "string", "value": "Old R1-2.svg" } },
                "qualifiers": { "P3295": [ { "datatype": "string", "datavalue": { "type": "string", "value": "null" } } ] } }
            ],
            "P856": [ { "id": "s7", "rank": "normal", "mainsnak": { "datatype": "url", "datavalue": { "type": "string", "value": "https://example.com/r1-2" } } } ],
            "P9410": [
              { "id": "s8", "rank": "normal",
                "mainsnak": { "datatype": "string", "datavalue": { "type": "string", "value": "distance" } },
                "qualifiers": {
                  "P1545": [ { "datatype": "string", "datavalue": { "type": "string", "value": "1" } } ],
                  "P8684": [ { "datatype": "quantity", "datavalue": { "type": "quantity", "value": { "amount": "+12.5", "unit": "1" } } } ],
                  "P8685": [ { "datatype": "quantity", "datavalue": { "type": "quantity", "value": { "amount": "+40", "unit": "1" } } } ],
                  "P2049": [ { "datatype": "quantity", "datavalue": { "type": "quantity", "value": { "amount": "+75", "unit": "1" } } } ],
                  "P2739": [ { "datatype": "wikibase-item", "datavalue": { "type": "wikibase-entityid", "value": { "id": "Q5" } } } ],
                  "P5831": [ { "datatype": "monolingualtext", "datavalue": { "type": "monolingualtext", "value": { "text": "200 m", "language": "en" } } } ]
                } },
              { "id": "s9", "rank": "normal",
                "mainsnak": { "datatype": "string", "snaktype": "novalue" },
                "qualifiers": { "P1545": [ { "datatype": "string", "datavalue": { "type": "string", "value": "0" } } ] } }
            ]
          }
        },
        "Q1002": {
          "labels": { "fr": { "language": "fr", "value": "Cédez le passage" } },
          "claims": {
            "P17": [ { "rank": "normal", "mainsnak": { "datatype": "wikibase-item", "datavalue": { "type": "wikibase-entityid", "value": { "id": "Q99999" } } } } ],
            "P528": [ { "rank": "normal", "mainsnak": { "datatype": "string", "datavalue": { "type": "string", "value": "AB3a" } } } ]
          }
        },
        "Q1003": {
          "labels": {},
          "claims": {
            "P17": [ { "rank": "normal", "mainsnak": { "datatype": "wikibase-item", "datavalue": { "type": "wikibase-entityid", "value": { "id": "Q408" } } } } ]
          }
        }
      }
    }"#;

    fn response() -> EntitiesResponse {
        serde_json::from_str(ENTITIES).unwrap()
    }

    #[test]
    fn query_uses_sign_class() {
        assert_eq!(
            sparql_query("Q109772990"),
            "SELECT ?sign WHERE { ?sign wdt:P31 wd:Q109772990; }"
        );
    }

    #[test]
    fn sparql_ids() {
        let body = r#"{"head":{"vars":["sign"]},"results":{"bindings":[
            {"sign":{"type":"uri","value":"http://www.wikidata.org/entity/Q1001"}},
            {"sign":{"type":"uri","value":"http://www.wikidata.org/entity/Q42"}},
            {"sign":{"type":"uri","value":"http://www.wikidata.org/entity/L12"}}
        ]}}"#;
        assert_eq!(parse_sparql_ids(body).unwrap(), vec!["Q1001", "Q42"]);
    }

    #[test]
    fn full_entity() {
        let db = records_from_entities(&response(), &WikidataConfig::default());
        assert_eq!(db.sign_count(), 1);

        let record = db.get("AU", "R1-2").unwrap();
        assert_eq!(record.name.as_deref(), Some("Give way"));
        assert_eq!(record.docs.as_deref(), Some("https://example.com/r1-2"));
        assert_eq!(
            record.urls.keys().collect::<Vec<_>>(),
            vec!["", "LARGE", "_"]
        );
        assert_eq!(
            record.urls["_"],
            "https://en.wikipedia.org/wiki/Special:FilePath/File:Old_R1-2.svg"
        );
    }

    #[test]
    fn placeholder_slots() {
        let db = records_from_entities(&response(), &WikidataConfig::default());
        let placeholders = db.get("AU", "R1-2").unwrap().placeholders.as_ref().unwrap();

        assert_eq!(placeholders.len(), 2);
        assert!(placeholders[0].is_none());
        let slot = placeholders[1].as_ref().unwrap();
        assert_eq!(slot.dom_id, "distance");
        assert_eq!(slot.x, Some(12.5));
        assert_eq!(slot.y, Some(40.0));
        assert_eq!(slot.width, Some(75.0));
        assert_eq!(slot.height, None);
        assert_eq!(slot.font.as_deref(), Some("Q5"));
        assert_eq!(slot.example.as_deref(), Some("200 m"));
        assert!(slot.kind.is_none());
    }

    #[test]
    fn configured_country_mapping() {
        let mut config = WikidataConfig::default();
        config.countries.insert("Q99999".into(), "FR".into());
        let db = records_from_entities(&response(), &config);
        let record = db.get("FR", "AB3A").unwrap();
        assert_eq!(record.name.as_deref(), Some("Cédez le passage"));
        assert!(record.urls.is_empty());
        assert!(record.placeholders.is_none());
    }

    #[test]
    fn configured_country_codes_are_uppercased() {
        let mut config = WikidataConfig::default();
        config.countries.insert("Q99999".into(), " fr ".into());
        let db = records_from_entities(&response(), &config);
        assert!(db.get("FR", "AB3A").is_some());
        assert!(db.signs("fr").is_none());
    }

    #[test]
    fn missing_entity_fields_are_tolerated() {
        let response: EntitiesResponse =
            serde_json::from_str(r#"{"entities":{"Q9":{"id":"Q9","missing":""}}}"#).unwrap();
        assert!(records_from_entities(&response, &WikidataConfig::default()).is_empty());
    }
}
