//! Quality control of raw mooring samples.
//!
//! Harmonic fitting and filtering require finite, plausible data. Samples are
//! removed in three stages:
//! 1. Non-finite values and CF fill values (|x| ≥ 1e30)
//! 2. Values outside a physically plausible range
//! 3. Iterative n-sigma clipping of the remaining samples

use super::TimeSeries;
use tracing::{debug, warn};

/// Magnitude at and above which a value is treated as a fill value.
const FILL_THRESHOLD: f64 = 1.0e30;

/// Check if a raw sample is usable (finite and not a fill value).
#[inline]
pub fn is_valid_sample(v: f64) -> bool {
    v.is_finite() && v.abs() < FILL_THRESHOLD
}

/// Counts of samples removed by each QC stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QcReport {
    /// Samples inspected
    pub total: usize,
    /// NaN, Inf or fill values
    pub non_finite: usize,
    /// Outside the valid range
    pub out_of_range: usize,
    /// Removed by sigma clipping
    pub outliers: usize,
}

impl QcReport {
    /// Total number of removed samples.
    pub fn removed(&self) -> usize {
        self.non_finite + self.out_of_range + self.outliers
    }

    /// Number of samples that passed.
    pub fn kept(&self) -> usize {
        self.total - self.removed()
    }
}

/// Quality control settings.
#[derive(Clone, Debug)]
pub struct QualityControl {
    /// Inclusive (min, max) of plausible values
    pub valid_range: Option<(f64, f64)>,
    /// Clip samples further than this many standard deviations from the mean
    pub sigma_clip: Option<f64>,
    /// Maximum number of clipping passes
    pub max_clip_passes: usize,
}

impl Default for QualityControl {
    fn default() -> Self {
        Self {
            valid_range: None,
            sigma_clip: None,
            max_clip_passes: 3,
        }
    }
}

impl QualityControl {
    /// Only remove non-finite and fill values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Practical/absolute salinity (g/kg).
    pub fn salinity() -> Self {
        Self::new().with_range(2.0, 42.0).with_sigma_clip(4.0)
    }

    /// In-situ or conservative temperature (°C).
    pub fn temperature() -> Self {
        Self::new().with_range(-2.5, 40.0).with_sigma_clip(4.0)
    }

    /// Sea pressure (dbar).
    pub fn pressure() -> Self {
        Self::new().with_range(-5.0, 11_000.0)
    }

    /// Horizontal velocity component (m/s).
    pub fn velocity() -> Self {
        Self::new().with_range(-5.0, 5.0).with_sigma_clip(5.0)
    }

    /// Set the valid range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.valid_range = Some((min.min(max), min.max(max)));
        self
    }

    /// Enable n-sigma clipping.
    pub fn with_sigma_clip(mut self, n_sigma: f64) -> Self {
        self.sigma_clip = Some(n_sigma.abs());
        self
    }

    /// Disable sigma clipping.
    pub fn without_sigma_clip(mut self) -> Self {
        self.sigma_clip = None;
        self
    }

    /// Set the maximum number of clipping passes.
    pub fn with_max_clip_passes(mut self, passes: usize) -> Self {
        self.max_clip_passes = passes;
        self
    }

    /// Compute which samples pass QC.
    pub fn mask(&self, values: &[f64]) -> (Vec<bool>, QcReport) {
        let mut report = QcReport {
            total: values.len(),
            ..QcReport::default()
        };
        let mut keep = vec![true; values.len()];

        for (k, &v) in keep.iter_mut().zip(values) {
            if !is_valid_sample(v) {
                *k = false;
                report.non_finite += 1;
            } else if self
                .valid_range
                .is_some_and(|(min, max)| !(min..=max).contains(&v))
            {
                *k = false;
                report.out_of_range += 1;
            }
        }

        if let Some(n_sigma) = self.sigma_clip {
            for pass in 0..self.max_clip_passes {
                let clipped = clip_pass(values, &mut keep, n_sigma);
                debug!(pass, clipped, "sigma clipping pass");
                if clipped == 0 {
                    break;
                }
                report.outliers += clipped;
            }
        }

        (keep, report)
    }

    /// Apply QC to a time series, returning the cleaned series and a report.
    pub fn apply(&self, series: &TimeSeries) -> (TimeSeries, QcReport) {
        let values = series.values();
        let (keep, report) = self.mask(&values);

        let data = series
            .data
            .iter()
            .zip(&keep)
            .filter(|&(_, &k)| k)
            .map(|(p, _)| *p)
            .collect();
        let cleaned = TimeSeries::from_points(data).with_metadata_of(series);

        if report.removed() > 0 {
            warn!(
                series = series.name.as_deref().unwrap_or("unnamed"),
                non_finite = report.non_finite,
                out_of_range = report.out_of_range,
                outliers = report.outliers,
                "quality control removed samples"
            );
        }

        (cleaned, report)
    }
}

/// One clipping pass over currently kept samples. Returns the number clipped.
fn clip_pass(values: &[f64], keep: &mut [bool], n_sigma: f64) -> usize {
    let kept: Vec<f64> = values
        .iter()
        .zip(keep.iter())
        .filter(|&(_, &k)| k)
        .map(|(&v, _)| v)
        .collect();
    if kept.len() < 3 {
        return 0;
    }

    let n = kept.len() as f64;
    let mean = kept.iter().sum::<f64>() / n;
    let std = (kept.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
    if std <= 0.0 {
        return 0;
    }

    let limit = n_sigma * std;
    let mut clipped = 0;
    for (k, &v) in keep.iter_mut().zip(values) {
        if *k && (v - mean).abs() > limit {
            *k = false;
            clipped += 1;
        }
    }
    clipped
}

/// Combine per-variable masks so a row survives only if every variable passed.
pub(crate) fn combine_masks(masks: &[&[bool]]) -> Vec<bool> {
    let n = masks.first().map_or(0, |m| m.len());
    (0..n).map(|i| masks.iter().all(|m| m[i])).collect()
}
