//! Build pipeline: run the adapters, load overrides, merge in precedence order.

use std::future::Future;
use std::time::Instant;

use anyhow::Context;
use clap::ValueEnum;
use roadsigns_core::{
    Config, Database, Layer, LayerKind, LayerStats, PartialDatabase, merge_with_stats,
};
use roadsigns_sources::{HttpClient, SourceError, nzta, tfnsw, wikidata, wikimedia};
use tracing::{info, warn};

/// An upstream source, listed in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Source {
    Wikimedia,
    Tfnsw,
    Nzta,
    Wikidata,
}

impl Source {
    pub const ALL: [Source; 4] = [Self::Wikimedia, Self::Tfnsw, Self::Nzta, Self::Wikidata];

    pub fn name(self) -> &'static str {
        match self {
            Self::Wikimedia => "wikimedia",
            Self::Tfnsw => "tfnsw",
            Self::Nzta => "nzta",
            Self::Wikidata => "wikidata",
        }
    }

    pub fn layer_kind(self) -> LayerKind {
        match self {
            Self::Wikidata => LayerKind::Override,
            Self::Wikimedia | Self::Tfnsw | Self::Nzta => LayerKind::Fill,
        }
    }

    fn enabled(self, config: &Config) -> bool {
        match self {
            Self::Wikimedia => config.sources.wikimedia,
            Self::Tfnsw => config.sources.tfnsw,
            Self::Nzta => config.sources.nzta,
            Self::Wikidata => config.sources.wikidata,
        }
    }
}

pub const OVERRIDES_SOURCE: &str = "overrides";

pub struct BuildStats {
    pub layers: Vec<LayerStats>,
    /// Sources that failed and were left out of the merge.
    pub failed: Vec<(Source, String)>,
    pub elapsed_secs: f64,
}

/// Fetch every enabled source concurrently, then merge them with the
/// overrides file on top. A failing source is logged and skipped.
pub async fn run_build(
    config: &Config,
    skip: &[Source],
) -> anyhow::Result<(Database, BuildStats)> {
    let start = Instant::now();
    let client = HttpClient::new(&config.user_agent).context("building HTTP client")?;
    let wanted = |source: Source| source.enabled(config) && !skip.contains(&source);

    let (from_wikimedia, from_tfnsw, from_nzta, from_wikidata) = tokio::join!(
        run_source(
            Source::Wikimedia,
            wanted(Source::Wikimedia),
            wikimedia::fetch(&client, &config.wiki_pages),
        ),
        run_source(Source::Tfnsw, wanted(Source::Tfnsw), tfnsw::fetch(&client)),
        run_source(Source::Nzta, wanted(Source::Nzta), nzta::fetch(&client)),
        run_source(
            Source::Wikidata,
            wanted(Source::Wikidata),
            wikidata::fetch(&client, &config.wikidata),
        ),
    );

    let results = [from_wikimedia, from_tfnsw, from_nzta, from_wikidata]
        .into_iter()
        .flatten()
        .collect();

    let overrides = roadsigns_store::load_overrides(&config.overrides)
        .with_context(|| format!("loading overrides from {}", config.overrides.display()))?;

    let (layers, failed) = assemble_layers(results, overrides);
    let (db, layer_stats) = merge_with_stats(layers);

    for stats in &layer_stats {
        info!(
            source = %stats.source,
            kind = %stats.kind,
            created = stats.created,
            replaced = stats.replaced,
            filled_fields = stats.filled_fields,
            added_urls = stats.added_urls,
            "applied layer"
        );
    }

    Ok((
        db,
        BuildStats {
            layers: layer_stats,
            failed,
            elapsed_secs: start.elapsed().as_secs_f64(),
        },
    ))
}

async fn run_source<F>(
    source: Source,
    enabled: bool,
    fetch: F,
) -> Option<(Source, Result<PartialDatabase, SourceError>)>
where
    F: Future<Output = Result<PartialDatabase, SourceError>>,
{
    if !enabled {
        info!(source = source.name(), "source disabled");
        return None;
    }
    let started = Instant::now();
    let result = fetch.await;
    match &result {
        Ok(db) => info!(
            source = source.name(),
            signs = db.sign_count(),
            secs = started.elapsed().as_secs_f64(),
            "source finished"
        ),
        Err(err) => warn!(
            source = source.name(),
            error = %err,
            "source failed, continuing without it"
        ),
    }
    Some((source, result))
}

/// Order successful sources by precedence and put overrides last.
pub fn assemble_layers(
    mut results: Vec<(Source, Result<PartialDatabase, SourceError>)>,
    overrides: PartialDatabase,
) -> (Vec<Layer>, Vec<(Source, String)>) {
    results.sort_by_key(|(source, _)| *source);

    let mut layers = Vec::with_capacity(results.len() + 1);
    let mut failed = Vec::new();
    for (source, result) in results {
        match result {
            Ok(data) => layers.push(Layer::new(source.name(), source.layer_kind(), data)),
            Err(err) => failed.push((source, err.to_string())),
        }
    }
    layers.push(Layer::override_fields(OVERRIDES_SOURCE, overrides));
    (layers, failed)
}
