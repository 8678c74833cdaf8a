mod display;
mod pipeline;

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use roadsigns_core::{Config, label_collisions, normalize_labels};
use roadsigns_store::JsonStore;
use tracing_subscriber::EnvFilter;

use pipeline::Source;

#[derive(Parser)]
#[command(name = "roadsigns")]
#[command(about = "Build a per-country registry of road sign images")]
#[command(version)]
struct Cli {
    /// TOML config file (built-in defaults when omitted)
    #[arg(long, short, global = true, env = "ROADSIGNS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source, merge them and write the database
    #[command(after_help = "\
Examples:
  roadsigns build
  roadsigns build --skip nzta --skip tfnsw
  roadsigns build -o out/index.json --overrides data/overrides.json")]
    Build {
        /// Output JSON file (overrides the config)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Manual overrides JSON file (overrides the config)
        #[arg(long)]
        overrides: Option<PathBuf>,

        /// Leave a source out of this run. Repeatable.
        #[arg(long, value_enum)]
        skip: Vec<Source>,
    },

    /// Print the variant labels extracted from a group of file names or URLs
    Labels {
        #[arg(required = true)]
        strings: Vec<String>,
    },

    /// Print saved records for a country, or one sign as a card
    Show {
        /// Country code, e.g. AU
        country: String,

        /// Sign code, e.g. R1-1
        code: Option<String>,

        /// Database file (defaults to the configured output)
        #[arg(long, short)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Build {
            output,
            overrides,
            skip,
        } => cmd_build(config, output, overrides, &skip).await,
        Commands::Labels { strings } => {
            cmd_labels(&strings);
            Ok(())
        }
        Commands::Show {
            country,
            code,
            database,
        } => cmd_show(&config, &country, code.as_deref(), database),
    }
}

async fn cmd_build(
    mut config: Config,
    output: Option<PathBuf>,
    overrides: Option<PathBuf>,
    skip: &[Source],
) -> anyhow::Result<()> {
    if let Some(output) = output {
        config.output = output;
    }
    if let Some(overrides) = overrides {
        config.overrides = overrides;
    }
    tracing::info!("roadsigns v{}", env!("CARGO_PKG_VERSION"));

    let (db, stats) = pipeline::run_build(&config, skip).await?;

    let store = JsonStore::new(&config.output);
    store
        .save(&db)
        .with_context(|| format!("writing {}", config.output.display()))?;

    eprintln!(
        "  {} signs across {} countries from {} layer(s) in {:.1}s",
        db.sign_count(),
        db.country_count(),
        stats.layers.len(),
        stats.elapsed_secs
    );
    for (source, error) in &stats.failed {
        eprintln!("  skipped {}: {error}", source.name());
    }
    eprintln!("  Wrote {}", config.output.display());
    Ok(())
}

fn cmd_labels(strings: &[String]) {
    for (label, original) in normalize_labels(strings) {
        let label = if label.is_empty() { "\"\"" } else { label.as_str() };
        println!("{label:<16} {original}");
    }
    let collisions = label_collisions(strings);
    if collisions > 0 {
        eprintln!("  {collisions} input(s) shadowed by a later input with the same label");
    }
}

fn cmd_show(
    config: &Config,
    country: &str,
    code: Option<&str>,
    database: Option<PathBuf>,
) -> anyhow::Result<()> {
    let path = database.unwrap_or_else(|| config.output.clone());
    let db = JsonStore::new(&path)
        .load()
        .with_context(|| format!("reading {}", path.display()))?;

    let country = country.to_uppercase();
    let Some(signs) = db.signs(&country) else {
        let known = db.countries().collect::<Vec<_>>().join(", ");
        bail!(
            "no signs for country {country} in {} (countries: {known})",
            path.display()
        );
    };

    match code {
        Some(code) => {
            let code = code.to_uppercase();
            let Some(record) = signs.get(&code) else {
                bail!("no sign {code} for country {country}");
            };
            print!("{}", display::render_card(&country, &code, record));
        }
        None => print!("{}", display::render_country(&country, signs)),
    }
    Ok(())
}
