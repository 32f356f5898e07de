//! Crash Atlas - Vehicle Collision Report
//!
//! Loads the collision dataset, applies the injury, hour and injury-type
//! selections and prints every dashboard section. Charts are written as PNG
//! files when an output directory is configured.

use anyhow::{Context, Result};
use clap::Parser;
use crash_atlas::charts::StaticChartRenderer;
use crash_atlas::config::DashboardConfig;
use crash_atlas::data::{DataProcessor, Dataset, DatasetCache, InjuryType, MINUTES_PER_HOUR};
use crash_atlas::report;
use crash_atlas::stats::{HexLayer, StatsCalculator};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crash_atlas", version, about = "Vehicle collision analysis report")]
struct Args {
    /// JSON settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// URL or local path of the collision CSV
    #[arg(long)]
    source: Option<String>,

    /// Number of source rows to read
    #[arg(long)]
    rows: Option<usize>,

    /// Minimum number of injured persons for the injury map
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=19))]
    min_injured: Option<u32>,

    /// Hour of the day (0-23)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=23))]
    hour: Option<u32>,

    /// Affected type of people: pedestrians, cyclists or motorists
    #[arg(long)]
    injury_type: Option<InjuryType>,

    /// Directory for PNG charts
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Dump the loaded records as JSON lines after the report
    #[arg(long)]
    raw: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_config(args: &Args) -> Result<DashboardConfig> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };

    if let Some(source) = &args.source {
        config.source = source.clone();
    }
    if let Some(rows) = args.rows {
        config.row_limit = rows;
    }
    if let Some(min_injured) = args.min_injured {
        config.min_injured = min_injured;
    }
    if let Some(hour) = args.hour {
        config.hour = hour;
    }
    if let Some(injury_type) = args.injury_type {
        config.injury_type = injury_type;
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

fn render_charts(
    dir: &Path,
    config: &DashboardConfig,
    injured: &[(f64, f64)],
    in_hour: &[(f64, f64)],
    layer: &HexLayer,
    histogram: &[u32; MINUTES_PER_HOUR],
) -> Result<()> {
    StaticChartRenderer::prepare_output_dir(dir)?;
    let size = config.chart_size();

    let path = dir.join("injured_map.png");
    StaticChartRenderer::render_point_map(
        injured,
        &format!("Crashes with {}+ injured persons", config.min_injured),
        &path,
        size,
    )?;
    info!(path = %path.display(), "Chart written");

    let path = dir.join("hour_map.png");
    StaticChartRenderer::render_point_map(
        in_hour,
        &format!("Crashes at {}:00", config.hour),
        &path,
        size,
    )?;
    info!(path = %path.display(), "Chart written");

    let path = dir.join("hexagon_density.png");
    StaticChartRenderer::render_hexagon_density(
        layer,
        "Collision density, all loaded crashes",
        &path,
        size,
    )?;
    info!(path = %path.display(), "Chart written");

    let path = dir.join("minute_histogram.png");
    StaticChartRenderer::render_minute_histogram(histogram, config.hour, &path, size)?;
    info!(path = %path.display(), "Chart written");

    Ok(())
}

fn print_report(dataset: &Dataset, config: &DashboardConfig) -> Result<()> {
    let injured = DataProcessor::filter_by_min_injured(dataset, config.min_injured);
    let in_hour = DataProcessor::filter_by_hour(dataset, config.hour);
    let view = StatsCalculator::view_state(dataset);
    let layer =
        StatsCalculator::hexagon_layer(&DataProcessor::points(dataset), config.hex_radius_m);
    let histogram = DataProcessor::minute_histogram(dataset, config.hour);
    let streets = DataProcessor::top_streets_by_injury_type(
        dataset,
        config.injury_type,
        config.top_streets_limit,
    );

    let sections = [
        report::dataset_summary(dataset, &config.source, config.row_limit),
        report::points_section(
            &format!("Number of people injured in collisions (>= {})", config.min_injured),
            &injured,
        ),
        report::points_section(
            &format!("Collisions during hour {} of the day", config.hour),
            &in_hour,
        ),
        report::hexagon_section(config.hour, view, &layer),
        report::minute_histogram_section(&histogram, config.hour),
        report::top_streets_section(config.injury_type, &streets),
        report::injury_summary_section(&StatsCalculator::injury_summaries(dataset)),
    ];
    println!("{}", sections.join("\n\n"));

    if let Some(dir) = &config.output_dir {
        render_charts(dir, config, &injured, &in_hour, &layer, &histogram)
            .with_context(|| format!("rendering charts to {}", dir.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = resolve_config(&args)?;

    let mut cache = DatasetCache::new(config.data_source());
    let dataset = cache
        .load(config.row_limit)
        .with_context(|| format!("loading collision data from {}", config.source))?;

    print_report(&dataset, &config)?;

    if args.raw {
        let stdout = std::io::stdout();
        report::write_raw(&dataset, stdout.lock()).context("writing raw records")?;
    }
    Ok(())
}
