//! Lineage Profiler CLI Application
//!
//! This is the command-line interface for the lineage profiler.
//! It uses the lineage-profiler library and adds:
//! - Experiment files (TOML) declaring plates and events
//! - Text and JSON rendering of the lineage tree
//! - Per-timepoint well partition listings

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lineage_profiler::{LineageBuilder, Timepoint};
use std::fs;
use std::path::PathBuf;

mod config;
mod report;

/// Lineage Profiler - Track how plate wells diverge over an experiment
#[derive(Parser, Debug)]
#[command(name = "lineage-cli")]
#[command(about = "Build well lineage trees from experiment event logs", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the experiment file (experiment.toml)
    #[arg(short, long, value_name = "FILE")]
    experiment: PathBuf,

    /// Output format for the lineage tree
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the well partition at this timepoint instead of the tree
    #[arg(long, value_name = "TIMEPOINT")]
    partition: Option<Timepoint>,

    /// Plate to partition (default: the first declared plate)
    #[arg(long, value_name = "ID", requires = "partition")]
    plate: Option<String>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Lineage Profiler CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using profiler library v{}", lineage_profiler::VERSION);

    log::info!("Loading experiment from: {:?}", args.experiment);
    let experiment = config::load_config(&args.experiment)?;
    let registry = experiment.registry()?;
    let timeline = experiment.timeline(&registry)?;
    log::debug!("Experiment loaded: {} plates, {} events", registry.len(), timeline.len());

    let rendered = if let Some(timepoint) = args.partition {
        let plate_id = experiment.partition_plate(args.plate.as_deref())?;
        let geometry = registry.geometry_of(&plate_id)?;
        report::render_partition(&timeline, timepoint, geometry)?
    } else {
        let tree = LineageBuilder::new(&timeline, &registry)
            .with_config(experiment.lineage_config()?)
            .build()
            .context("Failed to build lineage tree")?;

        match args.format {
            OutputFormat::Text => report::render_text(&tree)?,
            OutputFormat::Json => report::render_json(&tree)?,
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Failed to write output file: {:?}", path))?;
            log::info!("Report written to {:?}", path);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
