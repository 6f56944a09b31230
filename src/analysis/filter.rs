//! Boxcar (centered running mean) filter.
//!
//! Each output sample is the unweighted mean of `window` consecutive input
//! samples centred on it. A window spanning roughly two M2 cycles (25 h)
//! removes the semi-diurnal tide and leaves the subtidal signal.
//!
//! Near the ends of the record a full window is not available. The
//! [`EdgePolicy`] decides what happens there:
//! - [`EdgePolicy::Truncate`]: the `window / 2` samples at each end are dropped
//! - [`EdgePolicy::PadNearest`]: they take the nearest full-window mean

use super::{TimeSeries, TimeSeriesPoint};
use thiserror::Error;

/// Error type for boxcar filtering.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("window must be a positive odd number of samples, got {0}")]
    InvalidWindow(usize),

    #[error("window of {window} samples is longer than the series ({len} samples)")]
    WindowTooLong { window: usize, len: usize },

    #[error("non-finite sample at index {index}")]
    NonFiniteInput { index: usize },

    #[error("invalid filter duration: {hours} hours at {interval_hours} hours per sample")]
    InvalidDuration { hours: f64, interval_hours: f64 },
}

/// How to treat the ends of the record where a full window is unavailable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Drop edge samples; output has `n − window + 1` points.
    #[default]
    Truncate,
    /// Repeat the nearest full-window mean; output has `n` points.
    PadNearest,
}

/// Centered boxcar filter with an odd window length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxcarFilter {
    window: usize,
    edge_policy: EdgePolicy,
}

impl BoxcarFilter {
    /// Create a filter with `window` samples (must be odd and non-zero).
    pub fn new(window: usize) -> Result<Self, FilterError> {
        if window == 0 || window % 2 == 0 {
            return Err(FilterError::InvalidWindow(window));
        }
        Ok(Self {
            window,
            edge_policy: EdgePolicy::default(),
        })
    }

    /// Create a filter spanning `hours`, rounded to the nearest odd number of
    /// samples at the given sampling interval.
    pub fn from_hours(hours: f64, sampling_interval_hours: f64) -> Result<Self, FilterError> {
        let invalid = FilterError::InvalidDuration {
            hours,
            interval_hours: sampling_interval_hours,
        };
        if !(hours.is_finite() && hours > 0.0)
            || !(sampling_interval_hours.is_finite() && sampling_interval_hours > 0.0)
        {
            return Err(invalid);
        }

        let samples = (hours / sampling_interval_hours).round();
        if samples > usize::MAX as f64 / 2.0 {
            return Err(invalid);
        }
        let mut window = (samples as usize).max(1);
        if window % 2 == 0 {
            window += 1;
        }
        Self::new(window)
    }

    /// Set the edge policy.
    pub fn with_edge_policy(mut self, edge_policy: EdgePolicy) -> Self {
        self.edge_policy = edge_policy;
        self
    }

    /// Window length in samples.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Edge policy in use.
    pub fn edge_policy(&self) -> EdgePolicy {
        self.edge_policy
    }

    /// Filter a series.
    ///
    /// Under [`EdgePolicy::Truncate`] each output point keeps the time of its
    /// window centre.
    pub fn apply(&self, series: &TimeSeries) -> Result<TimeSeries, FilterError> {
        let n = series.len();
        if self.window > n {
            return Err(FilterError::WindowTooLong {
                window: self.window,
                len: n,
            });
        }
        if let Some(index) = series.first_non_finite() {
            return Err(FilterError::NonFiniteInput { index });
        }

        let means = self.window_means(&series.values());
        let half = self.window / 2;

        let data: Vec<TimeSeriesPoint> = match self.edge_policy {
            EdgePolicy::Truncate => series.data[half..n - half]
                .iter()
                .zip(&means)
                .map(|(p, &value)| TimeSeriesPoint {
                    time: p.time,
                    value,
                })
                .collect(),
            EdgePolicy::PadNearest => {
                let last = means.len() - 1;
                series
                    .data
                    .iter()
                    .enumerate()
                    .map(|(i, p)| TimeSeriesPoint {
                        time: p.time,
                        value: means[i.saturating_sub(half).min(last)],
                    })
                    .collect()
            }
        };

        Ok(TimeSeries::from_points(data).with_metadata_of(series))
    }

    /// Means of every full window, index k covering samples k..k+window.
    fn window_means(&self, values: &[f64]) -> Vec<f64> {
        let w = self.window as f64;
        values
            .windows(self.window)
            .map(|win| win.iter().sum::<f64>() / w)
            .collect()
    }
}
