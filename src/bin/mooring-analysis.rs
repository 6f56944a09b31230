//! # mooring-analysis
//!
//! Command-line driver: loads a CTD and a velocity record, fits the M2 tide,
//! derives the tidal ellipse, filters salinity and writes the four figures.
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=mooring_rs=debug`.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use mooring_rs::analysis::{EdgePolicy, InitialGuess, M2_PERIOD_HOURS};
use mooring_rs::pipeline::{
    DEFAULT_FILTER_HOURS, MooringAnalysis, PipelineConfig, load_ctd, load_velocity,
};
use mooring_rs::plot::FigureNaming;

#[derive(Parser)]
#[command(name = "mooring-analysis")]
#[command(about = "M2 tidal analysis of a CTD and current meter mooring", long_about = None)]
struct Cli {
    /// CTD record with PSAL, TEMP and PRES (NetCDF or text)
    #[arg(long)]
    ctd: PathBuf,

    /// Velocity record with UVEL and VVEL (NetCDF or text)
    #[arg(long)]
    velocity: PathBuf,

    /// Identifier used in figure file names
    #[arg(long)]
    identifier: String,

    /// Course name used in figure file names
    #[arg(long)]
    course: String,

    /// Directory for figures
    #[arg(short, long, default_value = "figures")]
    output: PathBuf,

    /// Harmonic period in hours
    #[arg(long, default_value_t = M2_PERIOD_HOURS)]
    period_hours: f64,

    /// Boxcar filter length in hours
    #[arg(long, default_value_t = DEFAULT_FILTER_HOURS)]
    filter_hours: f64,

    /// Filter edge handling
    #[arg(long, value_enum, default_value_t = Edge::Truncate)]
    edge: Edge,

    /// Seed the fit from the linear cosine/sine solution
    #[arg(long)]
    linear_guess: bool,

    /// Absolute salinity anomaly ratio
    #[arg(long, default_value_t = 0.0)]
    saar: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Edge {
    /// Drop samples without a full window
    Truncate,
    /// Repeat the nearest full-window mean
    Pad,
}

impl From<Edge> for EdgePolicy {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Truncate => EdgePolicy::Truncate,
            Edge::Pad => EdgePolicy::PadNearest,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();

    let cli = Cli::parse();

    let naming = FigureNaming::new(cli.identifier, cli.course)?;
    let initial_guess = if cli.linear_guess {
        InitialGuess::Linear
    } else {
        InitialGuess::Range
    };
    let config = PipelineConfig::new()
        .with_period_hours(cli.period_hours)
        .with_filter_hours(cli.filter_hours)
        .with_edge_policy(cli.edge.into())
        .with_initial_guess(initial_guess)
        .with_saar(cli.saar)
        .with_output_dir(cli.output)
        .with_naming(naming);

    let ctd = load_ctd(&cli.ctd)?;
    let velocity = load_velocity(&cli.velocity)?;

    let analysis = MooringAnalysis::new(config);
    let report = analysis.run(&ctd, &velocity)?;
    println!("{}", report);

    render(&analysis, &report)?;
    Ok(())
}

#[cfg(feature = "plotting")]
fn render(
    analysis: &MooringAnalysis,
    report: &mooring_rs::pipeline::AnalysisReport,
) -> Result<(), Box<dyn Error>> {
    for path in analysis.render_figures(report)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(not(feature = "plotting"))]
fn render(
    _analysis: &MooringAnalysis,
    _report: &mooring_rs::pipeline::AnalysisReport,
) -> Result<(), Box<dyn Error>> {
    tracing::warn!("Built without the plotting feature; no figures written");
    Ok(())
}
