//! Layered merge of per-source partial databases.
//!
//! Layers are folded strictly in the order given. Each carries a
//! [`LayerKind`] that decides how it treats records already in the
//! database:
//!
//! | kind             | missing record | existing record                          |
//! |------------------|----------------|------------------------------------------|
//! | `Fill`           | created        | only unset fields / absent URL variants  |
//! | `Override`       | created        | replaced wholesale                       |
//! | `OverrideFields` | created        | fields it sets win, others are kept      |

use tracing::debug;

use crate::record::{Database, PartialDatabase, SignRecord, fill_record};

/// Precedence policy for one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Add only what is not there yet.
    Fill,
    /// Ground-truth source: its record replaces any earlier one.
    Override,
    /// Manual curation: deep-merge field by field, always winning.
    OverrideFields,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fill => write!(f, "fill"),
            Self::Override => write!(f, "override"),
            Self::OverrideFields => write!(f, "override-fields"),
        }
    }
}

/// A fully materialised partial database plus its precedence tag.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Source name, used for logging only.
    pub source: String,
    pub kind: LayerKind,
    pub data: PartialDatabase,
}

impl Layer {
    pub fn new(source: impl Into<String>, kind: LayerKind, data: PartialDatabase) -> Self {
        Self {
            source: source.into(),
            kind,
            data,
        }
    }

    pub fn fill(source: impl Into<String>, data: PartialDatabase) -> Self {
        Self::new(source, LayerKind::Fill, data)
    }

    pub fn replace(source: impl Into<String>, data: PartialDatabase) -> Self {
        Self::new(source, LayerKind::Override, data)
    }

    pub fn override_fields(source: impl Into<String>, data: PartialDatabase) -> Self {
        Self::new(source, LayerKind::OverrideFields, data)
    }
}

/// What one layer did to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerStats {
    pub source: String,
    pub kind: LayerKind,
    /// Records that did not exist before this layer.
    pub created: usize,
    /// Existing records replaced wholesale (`Override` only).
    pub replaced: usize,
    /// Scalar fields or placeholder lists written into existing records.
    pub filled_fields: usize,
    /// URL variants written into existing records.
    pub added_urls: usize,
}

/// Fold `layers` into a fresh database.
pub fn merge(layers: impl IntoIterator<Item = Layer>) -> Database {
    merge_with_stats(layers).0
}

/// [`merge`], also reporting per-layer statistics in input order.
pub fn merge_with_stats(layers: impl IntoIterator<Item = Layer>) -> (Database, Vec<LayerStats>) {
    let mut db = Database::new();
    let mut stats = Vec::new();

    for layer in layers {
        let layer_stats = apply_layer(&mut db, layer);
        debug!(
            source = %layer_stats.source,
            kind = %layer_stats.kind,
            created = layer_stats.created,
            replaced = layer_stats.replaced,
            filled_fields = layer_stats.filled_fields,
            added_urls = layer_stats.added_urls,
            "merged layer"
        );
        stats.push(layer_stats);
    }

    (db, stats)
}

fn apply_layer(db: &mut Database, layer: Layer) -> LayerStats {
    let Layer { source, kind, data } = layer;
    let mut stats = LayerStats {
        source,
        kind,
        created: 0,
        replaced: 0,
        filled_fields: 0,
        added_urls: 0,
    };

    for (country, signs) in data {
        for (code, incoming) in signs {
            match kind {
                LayerKind::Override => {
                    if db.insert(country.as_str(), code, incoming).is_some() {
                        stats.replaced += 1;
                    } else {
                        stats.created += 1;
                    }
                }
                LayerKind::Fill => {
                    let (record, created) = db.record_mut(&country, &code);
                    let outcome = fill_record(record, incoming);
                    if created {
                        stats.created += 1;
                    } else {
                        stats.filled_fields += outcome.fields;
                        stats.added_urls += outcome.urls;
                    }
                }
                LayerKind::OverrideFields => {
                    let (record, created) = db.record_mut(&country, &code);
                    let (fields, urls) = override_record(record, incoming);
                    if created {
                        stats.created += 1;
                    } else {
                        stats.filled_fields += fields;
                        stats.added_urls += urls;
                    }
                }
            }
        }
    }

    stats
}

/// Deep-merge `incoming` over `target`: set scalars win, URL maps merge
/// key-wise with incoming winning, a set placeholder list replaces the old.
fn override_record(target: &mut SignRecord, incoming: SignRecord) -> (usize, usize) {
    let mut fields = 0;
    if incoming.name.is_some() {
        target.name = incoming.name;
        fields += 1;
    }
    if incoming.docs.is_some() {
        target.docs = incoming.docs;
        fields += 1;
    }
    if incoming.placeholders.is_some() {
        target.placeholders = incoming.placeholders;
        fields += 1;
    }
    let urls = incoming.urls.len();
    target.urls.extend(incoming.urls);
    (fields, urls)
}
