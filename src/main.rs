// 🧭 hiring-trends CLI
// fetch → aggregate → export → summarize → geocode → rank

use anyhow::Result;
use clap::Parser;
use hiring_trends::config::{Config, GEOCODE_KEY_ENV};
use hiring_trends::geocode::{GeocodeSource, GooglePlacesGeocoder};
use hiring_trends::source::{CommentSource, HnApiSource};
use hiring_trends::{logging, Pipeline, PipelineOptions, Traversal};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "hiring-trends", version, about = "Perk, title, skill and city trends from HN hiring threads")]
struct Cli {
    /// JSON config file (defaults apply to anything it leaves out)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Do not fetch; analyze cached snapshots only
    #[arg(long)]
    offline: bool,

    /// Leave cities without coordinates (keeps any earlier locations.json)
    #[arg(long)]
    skip_geocode: bool,

    /// Count replies as well as top-level comments
    #[arg(long)]
    full_tree: bool,

    /// Geocoding API key
    #[arg(long, env = GEOCODE_KEY_ENV, hide_env_values = true)]
    geocode_key: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if cli.full_tree {
        config.traversal = Traversal::FullTree;
    }
    if cli.geocode_key.is_some() {
        config.geocode.api_key = cli.geocode_key.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    println!("🧭 hiring-trends v{}", hiring_trends::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Data directory: {}", config.data_dir.display());
    println!("🧵 Threads: {} ({})", config.threads.len(), config.traversal.as_str());

    let pipeline = Pipeline::new(&config)?;
    let options = PipelineOptions {
        offline: cli.offline,
        skip_geocode: cli.skip_geocode,
    };

    let live = if options.offline {
        None
    } else {
        Some(HnApiSource::new(config.hn.clone(), config.http.clone())?)
    };

    let geocoder = match (&config.geocode.api_key, options.skip_geocode) {
        (Some(key), false) => {
            Some(GooglePlacesGeocoder::new(&config.geocode, key.clone(), config.http.clone())?)
        }
        (None, false) => {
            warn!("no geocoding key set ({}), cities will not be geocoded", GEOCODE_KEY_ENV);
            None
        }
        (_, true) => None,
    };

    let summary = pipeline.run(
        &options,
        live.as_ref().map(|s| s as &dyn CommentSource),
        geocoder.as_ref().map(|g| g as &dyn GeocodeSource),
    )?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Run {} complete", summary.run_id);
    println!("✓ Months analyzed: {:?}", summary.analyzed);
    if !summary.skipped.is_empty() {
        println!("⚠️  Months skipped: {:?}", summary.skipped);
    }
    println!(
        "✓ Cities geocoded: {}/{}",
        summary.locations.iter().filter(|l| l.is_geocoded()).count(),
        summary.locations.len()
    );
    println!("📤 Exports written to {}", pipeline.exporter().dir().display());

    Ok(())
}
