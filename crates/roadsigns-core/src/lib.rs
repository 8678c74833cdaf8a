pub mod config;
pub mod label;
pub mod merge;
pub mod record;

pub use config::{Config, ConfigError, SourceToggles, WikiPage, WikidataConfig};
pub use label::{label_collisions, normalize_labels};
pub use merge::{Layer, LayerKind, LayerStats, merge, merge_with_stats};
pub use record::{
    Database, PartialDatabase, PartialRecord, Placeholder, SignRecord, split_sign_codes,
    strip_label_punctuation,
};
