//! Pipeline configuration builder.

use std::path::PathBuf;

use crate::analysis::{EdgePolicy, InitialGuess, M2_PERIOD_HOURS, QualityControl};
use crate::plot::FigureNaming;

/// Default boxcar length (hours), roughly two M2 cycles.
pub const DEFAULT_FILTER_HOURS: f64 = 25.0;

/// Quality control presets per measured variable.
#[derive(Debug, Clone)]
pub struct QcConfig {
    /// Practical salinity
    pub salinity: QualityControl,
    /// In-situ temperature
    pub temperature: QualityControl,
    /// Sea pressure
    pub pressure: QualityControl,
    /// U and V velocity components
    pub velocity: QualityControl,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            salinity: QualityControl::salinity(),
            temperature: QualityControl::temperature(),
            pressure: QualityControl::pressure(),
            velocity: QualityControl::velocity(),
        }
    }
}

impl QcConfig {
    /// Only drop non-finite and fill values.
    pub fn minimal() -> Self {
        Self {
            salinity: QualityControl::new(),
            temperature: QualityControl::new(),
            pressure: QualityControl::new(),
            velocity: QualityControl::new(),
        }
    }
}

/// Configuration for a mooring analysis run.
///
/// # Example
///
/// ```ignore
/// use mooring_rs::pipeline::PipelineConfig;
/// use mooring_rs::analysis::EdgePolicy;
///
/// let config = PipelineConfig::new()
///     .with_filter_hours(25.0)
///     .with_edge_policy(EdgePolicy::PadNearest)
///     .with_output_dir("figures");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Harmonic period (hours)
    pub period_hours: f64,
    /// Boxcar filter length (hours)
    pub filter_hours: f64,
    /// Filter edge handling
    pub edge_policy: EdgePolicy,
    /// Harmonic fit starting point
    pub initial_guess: InitialGuess,
    /// Harmonic fit iteration budget
    pub max_iterations: usize,
    /// Quality control presets
    pub qc: QcConfig,
    /// Directory for figures
    pub output_dir: PathBuf,
    /// Figure file naming; figures are not rendered without it
    pub naming: Option<FigureNaming>,
    /// Absolute salinity anomaly ratio applied to all samples
    pub saar: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period_hours: M2_PERIOD_HOURS,
            filter_hours: DEFAULT_FILTER_HOURS,
            edge_policy: EdgePolicy::default(),
            initial_guess: InitialGuess::default(),
            max_iterations: 200,
            qc: QcConfig::default(),
            output_dir: PathBuf::from("figures"),
            naming: None,
            saar: 0.0,
        }
    }
}

impl PipelineConfig {
    /// Default configuration (M2, 25 h boxcar, truncated edges).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the harmonic period.
    pub fn with_period_hours(mut self, period_hours: f64) -> Self {
        self.period_hours = period_hours;
        self
    }

    /// Set the boxcar filter length.
    pub fn with_filter_hours(mut self, filter_hours: f64) -> Self {
        self.filter_hours = filter_hours;
        self
    }

    /// Set the filter edge policy.
    pub fn with_edge_policy(mut self, edge_policy: EdgePolicy) -> Self {
        self.edge_policy = edge_policy;
        self
    }

    /// Set the harmonic fit initial guess.
    pub fn with_initial_guess(mut self, initial_guess: InitialGuess) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    /// Set the harmonic fit iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace the quality control presets.
    pub fn with_qc(mut self, qc: QcConfig) -> Self {
        self.qc = qc;
        self
    }

    /// Set the figure output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set figure naming.
    pub fn with_naming(mut self, naming: FigureNaming) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Set a constant absolute salinity anomaly ratio.
    pub fn with_saar(mut self, saar: f64) -> Self {
        self.saar = saar;
        self
    }
}
