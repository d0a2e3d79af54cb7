//! Raster-to-polygon aggregator.
//!
//! Maps a polygon set onto the cells of a gridded layer once, then computes a
//! per-polygon statistic for every time slice of a year and writes the result
//! as a Parquet table keyed by polygon id.

mod config;
mod config_loader;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config_loader::{LoggingConfig, Overrides};
use pipeline::AggregationPipeline;
use zonal_common::Cadence;

#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(about = "Zonal statistics of gridded layers over polygon sets")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "R2P_CONFIG", default_value = "config/config.yaml")]
    config: String,

    /// Year to process (overrides the config file)
    #[arg(short, long)]
    year: Option<i32>,

    /// Temporal frequency: yearly, monthly or daily (overrides the config file)
    #[arg(short = 'f', long)]
    temporal_freq: Option<Cadence>,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let overrides = Overrides {
        year: args.year,
        temporal_freq: args.temporal_freq,
        log_level: args.log_level.clone(),
    };

    let config = config_loader::load_config(&args.config, &overrides)?;
    let plan = config.to_run_plan()?;

    with_run_logging(&config.logging, || {
        info!(config = %args.config, "Starting raster to polygon aggregation");

        let result = AggregationPipeline::new(plan).run();
        if let Err(e) = &result {
            error!(error = %format!("{:#}", e), "Aggregation failed");
        }
        result.map(|_| ())
    })
}

/// Run `f` with a subscriber that lives only for this run.
fn with_run_logging<T>(logging: &LoggingConfig, f: impl FnOnce() -> T) -> T {
    let level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if logging.format == "pretty" {
        tracing::subscriber::with_default(builder.pretty().finish(), f)
    } else {
        tracing::subscriber::with_default(builder.json().finish(), f)
    }
}
