//! Time series analysis for mooring records.
//!
//! This module provides tools for:
//! - Normalizing raw time coordinates to fractional days
//! - Quality control (gaps, fill values, outliers) ahead of fitting
//! - Fitting a fixed-period tidal harmonic with nonlinear least squares
//! - Boxcar (running mean) filtering
//! - Tidal current ellipses from U/V harmonic fits
//!
//! # Mathematical Background
//!
//! A single tidal constituent is modeled as:
//! ```text
//! y(t) = A cos(ωt − φ) + C
//! ```
//!
//! Where:
//! - ω = 2π/T (angular frequency from the fixed constituent period, rad/day)
//! - A is the amplitude, C the offset (mean level)
//! - φ is the phase lag in radians, wrapped to [0, 2π)
//!
//! Only A, φ and C are estimated; the period is always supplied by the caller.
//!
//! # Example - Harmonic Fit
//!
//! ```ignore
//! use mooring_rs::analysis::{HarmonicFitter, TimeSeries, normalize_to_days};
//!
//! let days = normalize_to_days(&raw_seconds)?;
//! let series = TimeSeries::new(&days, &salinity);
//!
//! let fit = HarmonicFitter::m2().fit(&series)?;
//! println!("M2 amplitude: {:.3} g/kg", fit.parameters.amplitude);
//! println!("M2 phase: {:.1} deg", fit.parameters.phase_degrees());
//! ```
//!
//! # Example - Tidal Ellipse
//!
//! ```ignore
//! use mooring_rs::analysis::{HarmonicFitter, TidalEllipse};
//!
//! let fitter = HarmonicFitter::m2();
//! let u_fit = fitter.fit(&currents.u_series())?;
//! let v_fit = fitter.fit(&currents.v_series())?;
//!
//! let ellipse = TidalEllipse::from_fits(&u_fit.parameters, &v_fit.parameters)?;
//! println!("Major axis: {:.3} m/s", ellipse.semi_major);
//! ```

mod current;
mod ellipse;
mod filter;
mod harmonic;
mod qc;
mod time;

pub use current::{CurrentPoint, CurrentTimeSeries};
pub use ellipse::{EllipseError, Rotation, TidalEllipse};
pub use filter::{BoxcarFilter, EdgePolicy, FilterError};
pub use harmonic::{
    FitError, HarmonicFit, HarmonicFitter, HarmonicParameters, InitialGuess, M2_PERIOD_HOURS,
    ParameterErrors,
};
pub use qc::{QcReport, QualityControl};
pub(crate) use qc::combine_masks;
pub use time::{
    CfTimeUnits, SECONDS_PER_DAY, TimeError, TimeUnit, normalize_to_days,
    sampling_interval_seconds,
};

use std::f64::consts::PI;

/// A single time series data point.
#[derive(Clone, Copy, Debug)]
pub struct TimeSeriesPoint {
    /// Time (fractional days once normalized)
    pub time: f64,
    /// Value (salinity in g/kg, velocity in m/s, etc.)
    pub value: f64,
}

/// Time series with optional metadata.
///
/// Stores a sequence of (time, value) pairs along with optional
/// location and name information.
#[derive(Clone, Debug)]
pub struct TimeSeries {
    /// The time series data points
    pub data: Vec<TimeSeriesPoint>,
    /// Optional (longitude, latitude) of the instrument
    pub location: Option<(f64, f64)>,
    /// Optional name/identifier
    pub name: Option<String>,
}

impl TimeSeries {
    /// Create a new time series from parallel arrays of times and values.
    ///
    /// # Panics
    ///
    /// Panics if `times` and `values` have different lengths.
    pub fn new(times: &[f64], values: &[f64]) -> Self {
        assert_eq!(
            times.len(),
            values.len(),
            "times and values must have same length"
        );

        let data = times
            .iter()
            .zip(values.iter())
            .map(|(&time, &value)| TimeSeriesPoint { time, value })
            .collect();

        Self {
            data,
            location: None,
            name: None,
        }
    }

    /// Create a time series directly from points.
    pub fn from_points(data: Vec<TimeSeriesPoint>) -> Self {
        Self {
            data,
            location: None,
            name: None,
        }
    }

    /// Create a time series with location information.
    pub fn with_location(mut self, longitude: f64, latitude: f64) -> Self {
        self.location = Some((longitude, latitude));
        self
    }

    /// Create a time series with a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Copy name and location from another series.
    pub(crate) fn with_metadata_of(mut self, other: &TimeSeries) -> Self {
        self.name = other.name.clone();
        self.location = other.location;
        self
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the time series is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Duration of the time series (last time - first time).
    pub fn duration(&self) -> f64 {
        match (self.data.first(), self.data.last()) {
            (Some(first), Some(last)) => last.time - first.time,
            _ => 0.0,
        }
    }

    /// Get times as a vector.
    pub fn times(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.time).collect()
    }

    /// Get values as a vector.
    pub fn values(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.value).collect()
    }

    /// Compute the mean value.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|p| p.value).sum::<f64>() / self.data.len() as f64
    }

    /// Compute the variance.
    pub fn variance(&self) -> f64 {
        if self.data.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self.data.iter().map(|p| (p.value - mean).powi(2)).sum();
        sum_sq / (self.data.len() - 1) as f64
    }

    /// Compute the standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum and maximum value, `None` if empty.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.data.is_empty() {
            return None;
        }
        let (min, max) = self
            .data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.value), hi.max(p.value))
            });
        Some((min, max))
    }

    /// Peak-to-peak range (max - min).
    pub fn peak_to_peak(&self) -> f64 {
        self.value_range().map_or(0.0, |(min, max)| max - min)
    }

    /// Index of the first non-finite time or value, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.data
            .iter()
            .position(|p| !p.time.is_finite() || !p.value.is_finite())
    }
}

/// Wrap a phase angle to the range [0, 2π).
pub fn wrap_phase(phase: f64) -> f64 {
    let mut p = phase % (2.0 * PI);
    if p < 0.0 {
        p += 2.0 * PI;
    }
    // -tiny % 2π + 2π rounds to exactly 2π
    if p >= 2.0 * PI { 0.0 } else { p }
}

/// Compute phase difference wrapped to [-π, π].
pub fn phase_difference(phase1: f64, phase2: f64) -> f64 {
    let diff = phase1 - phase2;
    let mut wrapped = diff % (2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    } else if wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}
