//! # mooring-rs
//!
//! Tidal analysis of oceanographic mooring records.
//!
//! This crate provides the building blocks for analysing a single mooring
//! with a CTD and a current meter:
//! - Time coordinate normalization and CF `units` parsing
//! - Quality control (fill values, range checks, sigma clipping)
//! - TEOS-10 Absolute Salinity and Conservative Temperature
//! - Fixed-period (M2) harmonic fitting with Levenberg–Marquardt
//! - Centered boxcar filtering
//! - Tidal current ellipses
//! - Text and NetCDF record I/O
//! - Static PNG figures (feature `plotting`)
//! - An end-to-end pipeline driving all of the above

pub mod analysis;
pub mod equations;
pub mod io;
pub mod pipeline;
pub mod plot;

// Re-export main types for convenience
pub use analysis::{
    BoxcarFilter, CurrentTimeSeries, EdgePolicy, HarmonicFit, HarmonicFitter, HarmonicParameters,
    M2_PERIOD_HOURS, QualityControl, TidalEllipse, TimeSeries, normalize_to_days,
};
pub use equations::{SalinityAnomaly, Teos10};
pub use io::{CtdRecord, VelocityRecord};
pub use pipeline::{AnalysisReport, MooringAnalysis, PipelineConfig, PipelineError};
pub use plot::{Figure, FigureNaming};
