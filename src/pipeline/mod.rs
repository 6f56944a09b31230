//! End-to-end mooring analysis.
//!
//! The pipeline chains the analysis building blocks for one mooring:
//!
//! 1. Load a CTD record and a velocity record (text or NetCDF)
//! 2. Normalize time to days since the first sample
//! 3. Drop rows failing quality control
//! 4. Convert practical salinity and in-situ temperature to TEOS-10
//!    Absolute Salinity and Conservative Temperature
//! 5. Fit the M2 harmonic to SA, CT, U and V
//! 6. Boxcar-filter SA
//! 7. Derive the tidal current ellipse
//! 8. Render the four figures (feature `plotting`)
//!
//! Every step either succeeds or aborts the run with a [`PipelineError`].
//!
//! # Example
//!
//! ```ignore
//! use mooring_rs::pipeline::{MooringAnalysis, PipelineConfig, load_ctd, load_velocity};
//! use mooring_rs::plot::FigureNaming;
//!
//! let ctd = load_ctd(Path::new("data/ctd.nc"))?;
//! let velocity = load_velocity(Path::new("data/vel.nc"))?;
//!
//! let config = PipelineConfig::new()
//!     .with_naming(FigureNaming::new("Hansen", "Messfern")?)
//!     .with_output_dir("figures");
//! let analysis = MooringAnalysis::new(config);
//! let report = analysis.run(&ctd, &velocity)?;
//! analysis.render_figures(&report)?;
//! ```

mod config;
mod runner;

pub use config::{DEFAULT_FILTER_HOURS, PipelineConfig, QcConfig};
pub use runner::{AnalysisReport, MooringAnalysis, RecordQc};

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::analysis::{EllipseError, FilterError, FitError, TimeError};
use crate::equations::Teos10Error;
use crate::io::{CtdRecord, RecordFileError, VelocityRecord, read_ctd_file, read_velocity_file};
use crate::plot::PlotError;

#[cfg(feature = "netcdf")]
use crate::io::{NetCDFError, read_ctd_netcdf, read_velocity_netcdf};

/// Error type for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text record could not be read
    #[error("Record file error: {0}")]
    RecordFile(#[from] RecordFileError),

    /// NetCDF record could not be read
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] NetCDFError),

    /// File type not readable with the enabled features
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// Unusable time coordinate
    #[error("Time coordinate error: {0}")]
    Time(#[from] TimeError),

    /// Neither record carries a position
    #[error("No position for station {0}")]
    MissingPosition(String),

    /// TEOS-10 conversion failed
    #[error("TEOS-10 error: {0}")]
    Teos10(#[from] Teos10Error),

    /// Harmonic fit failed
    #[error("Harmonic fit of {series} failed: {source}")]
    Fit {
        series: &'static str,
        #[source]
        source: FitError,
    },

    /// Boxcar filter failed
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    /// Tidal ellipse could not be derived
    #[error("Ellipse error: {0}")]
    Ellipse(#[from] EllipseError),

    /// Figure rendering failed
    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    /// Figures requested without an identifier and course
    #[error("Figure naming not configured")]
    MissingNaming,
}

fn is_netcdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "nc" | "nc4" | "cdf"))
}

/// Load a CTD record, choosing the reader from the file extension.
///
/// `.nc`, `.nc4` and `.cdf` files are read as NetCDF, anything else as text.
pub fn load_ctd(path: &Path) -> Result<CtdRecord, PipelineError> {
    let record = if is_netcdf(path) {
        read_ctd_netcdf_checked(path)?
    } else {
        read_ctd_file(path)?
    };
    info!(path = %path.display(), samples = record.len(), "Loaded CTD record");
    Ok(record)
}

/// Load a velocity record, choosing the reader from the file extension.
pub fn load_velocity(path: &Path) -> Result<VelocityRecord, PipelineError> {
    let record = if is_netcdf(path) {
        read_velocity_netcdf_checked(path)?
    } else {
        read_velocity_file(path)?
    };
    info!(path = %path.display(), samples = record.len(), "Loaded velocity record");
    Ok(record)
}

#[cfg(feature = "netcdf")]
fn read_ctd_netcdf_checked(path: &Path) -> Result<CtdRecord, PipelineError> {
    Ok(read_ctd_netcdf(path)?)
}

#[cfg(not(feature = "netcdf"))]
fn read_ctd_netcdf_checked(path: &Path) -> Result<CtdRecord, PipelineError> {
    Err(netcdf_disabled(path))
}

#[cfg(feature = "netcdf")]
fn read_velocity_netcdf_checked(path: &Path) -> Result<VelocityRecord, PipelineError> {
    Ok(read_velocity_netcdf(path)?)
}

#[cfg(not(feature = "netcdf"))]
fn read_velocity_netcdf_checked(path: &Path) -> Result<VelocityRecord, PipelineError> {
    Err(netcdf_disabled(path))
}

#[cfg(not(feature = "netcdf"))]
fn netcdf_disabled(path: &Path) -> PipelineError {
    PipelineError::UnsupportedFormat(format!(
        "{} (built without the netcdf feature)",
        path.display()
    ))
}
