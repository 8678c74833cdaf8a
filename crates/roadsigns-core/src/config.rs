//! Run configuration, loaded from an optional TOML file.
//!
//! Every key is optional; an empty file yields [`Config::default`].
//!
//! ```toml
//! output = "data/index.json"
//! overrides = "data/overrides.json"
//!
//! [sources]
//! nzta = false
//!
//! [[wiki_pages]]
//! country = "AU"
//! page = "Road signs in Australia"
//! pattern = '(?m)^(?<image>File:.+)\|\((?<code>[^)]+)\)'
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the merged database is written.
    pub output: PathBuf,
    /// Manually curated partial database, merged last.
    pub overrides: PathBuf,
    pub user_agent: String,
    pub sources: SourceToggles,
    pub wiki_pages: Vec<WikiPage>,
    pub wikidata: WikidataConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data/index.json"),
            overrides: PathBuf::from("data/overrides.json"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: SourceToggles::default(),
            wiki_pages: default_wiki_pages(),
            wikidata: WikidataConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise use built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Per-source on/off switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceToggles {
    pub wikimedia: bool,
    pub tfnsw: bool,
    pub nzta: bool,
    pub wikidata: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            wikimedia: true,
            tfnsw: true,
            nzta: true,
            wikidata: true,
        }
    }
}

/// A Wikipedia article listing one country's signs.
///
/// `pattern` must define the named groups `image` (a `File:` name) and
/// `code` (the raw code cell, possibly `A/B`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WikiPage {
    pub country: String,
    pub page: String,
    pub pattern: String,
}

impl WikiPage {
    fn new(country: &str, page: &str, pattern: &str) -> Self {
        Self {
            country: country.to_string(),
            page: page.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

pub fn default_wiki_pages() -> Vec<WikiPage> {
    vec![
        WikiPage::new(
            "AU",
            "Road signs in Australia",
            r"(?m)^(?<image>File:.+)\|\((?<code>[^)]+)\)",
        ),
        WikiPage::new(
            "DE",
            "Road signs in Germany",
            r"(?m)^(?<image>File:.+)\|'''Sign (?<code>[^']+)'''",
        ),
        WikiPage::new(
            "NL",
            "Road signs in the Netherlands",
            r"(?m)^(?<image>File:.+)\|(?<code>[^\n :]+):",
        ),
        WikiPage::new(
            "NZ",
            "Road signs in New Zealand",
            r"(?m)^(?<image>File:.+)\|\((\[https[^ ]+ )?(?<code>[^)\]]+)\]?\)",
        ),
        WikiPage::new(
            "US",
            "Road signs in the United States",
            r"(?m)^(?<image>File:MUTCD (?<code>.+).svg)\|",
        ),
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    /// Item id of the "road sign design" class every fetched item instantiates.
    pub sign_class: String,
    /// Entities per `wbgetentities` request.
    pub chunk_size: usize,
    /// Country item id (`Q408`) → ISO 3166 alpha-2 code (`AU`).
    pub countries: BTreeMap<String, String>,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            sign_class: "Q109772990".to_string(),
            chunk_size: 100,
            countries: default_country_items(),
        }
    }
}

fn default_country_items() -> BTreeMap<String, String> {
    [
        ("Q16", "CA"),
        ("Q17", "JP"),
        ("Q20", "NO"),
        ("Q27", "IE"),
        ("Q29", "ES"),
        ("Q30", "US"),
        ("Q31", "BE"),
        ("Q33", "FI"),
        ("Q34", "SE"),
        ("Q35", "DK"),
        ("Q36", "PL"),
        ("Q38", "IT"),
        ("Q39", "CH"),
        ("Q40", "AT"),
        ("Q45", "PT"),
        ("Q55", "NL"),
        ("Q142", "FR"),
        ("Q145", "GB"),
        ("Q183", "DE"),
        ("Q408", "AU"),
        ("Q664", "NZ"),
    ]
    .into_iter()
    .map(|(item, iso)| (item.to_string(), iso.to_string()))
    .collect()
}
