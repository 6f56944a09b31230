//! Fixed-period harmonic fitting for tidal time series.
//!
//! Fits a single cosine at a known period using nonlinear least squares.
//!
//! # Mathematical Background
//!
//! The signal is modeled as:
//! ```text
//! y(t) = A cos(ωt − φ) + C,   ω = 2π / (T / 24)   [t in days, T in hours]
//! ```
//!
//! The parameters p = [A, φ, C] minimize Σ (yᵢ − y(tᵢ))² using
//! Levenberg–Marquardt. With residual r = y − f(p) and Jacobian
//! ```text
//! J = [cos(ωt − φ),  A sin(ωt − φ),  1]
//! ```
//! each step solves the damped normal equations
//! ```text
//! (JᵀJ + λ diag(JᵀJ)) δ = Jᵀr
//! ```
//!
//! The period is never estimated. A negative amplitude is folded into the
//! phase (A → −A, φ → φ + π) and φ is reported in [0, 2π).

use super::{TimeSeries, TimeSeriesPoint, wrap_phase};
use faer::{Mat, linalg::solvers::Solve};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

/// Period of the principal lunar semi-diurnal constituent (hours).
pub const M2_PERIOD_HOURS: f64 = 12.4206;

/// Minimum number of samples: three parameters plus one degree of freedom.
const MIN_POINTS: usize = 4;

const LAMBDA_INITIAL: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;
/// Below this the [1, cos ωt, sin ωt] columns are treated as collinear
const MIN_SAMPLING_DETERMINANT: f64 = 1e-8;

/// Error type for harmonic fitting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    /// NaN or Inf in the input; remove these with quality control first
    #[error("non-finite sample at index {index}; apply quality control before fitting")]
    NonFiniteInput { index: usize },

    /// Not enough samples to determine amplitude, phase and offset
    #[error("insufficient data: expected at least {expected} samples, got {got}")]
    InsufficientData { expected: usize, got: usize },

    /// Constant series, no harmonic can be identified
    #[error("series has zero variance")]
    ZeroVariance,

    /// Period must be positive and finite
    #[error("invalid period: {0} hours")]
    InvalidPeriod(f64),

    /// Sample times alias the period, e.g. one sample per cycle
    #[error("sampling cannot separate amplitude, phase and offset at this period")]
    Degenerate,

    /// Iteration budget exhausted or damping exploded
    #[error("harmonic fit did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    /// Parameters became non-finite
    #[error("harmonic fit diverged")]
    Diverged,
}

/// Fitted harmonic parameters for one constituent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HarmonicParameters {
    /// Amplitude (units of the fitted variable), non-negative
    pub amplitude: f64,
    /// Phase lag in radians [0, 2π)
    pub phase: f64,
    /// Offset (mean level)
    pub offset: f64,
    /// Fixed period in hours
    pub period_hours: f64,
}

impl HarmonicParameters {
    /// Create parameters; phase is wrapped to [0, 2π).
    pub fn new(amplitude: f64, phase: f64, offset: f64, period_hours: f64) -> Self {
        Self {
            amplitude,
            phase: wrap_phase(phase),
            offset,
            period_hours,
        }
    }

    /// M2 parameters.
    pub fn m2(amplitude: f64, phase: f64, offset: f64) -> Self {
        Self::new(amplitude, phase, offset, M2_PERIOD_HOURS)
    }

    /// Angular frequency in radians per day.
    pub fn angular_frequency(&self) -> f64 {
        angular_frequency(self.period_hours)
    }

    /// Period in days.
    pub fn period_days(&self) -> f64 {
        self.period_hours / 24.0
    }

    /// Phase in degrees [0, 360).
    pub fn phase_degrees(&self) -> f64 {
        self.phase.to_degrees()
    }

    /// Evaluate A cos(ωt − φ) + C at time t (days).
    pub fn evaluate(&self, t: f64) -> f64 {
        self.amplitude * (self.angular_frequency() * t - self.phase).cos() + self.offset
    }

    /// Evaluate the model at the given times.
    pub fn reconstruct(&self, times: &[f64]) -> Vec<f64> {
        times.iter().map(|&t| self.evaluate(t)).collect()
    }
}

/// One-sigma parameter uncertainties from the fit covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterErrors {
    pub amplitude: f64,
    pub phase: f64,
    pub offset: f64,
}

/// Result of a harmonic fit.
#[derive(Clone, Debug)]
pub struct HarmonicFit {
    /// Fitted parameters
    pub parameters: HarmonicParameters,
    /// Observed minus model, on the input time base
    pub residuals: TimeSeries,
    /// Levenberg–Marquardt iterations used
    pub iterations: usize,
    /// Residual variance (unexplained variance)
    pub residual_variance: f64,
    /// Coefficient of determination R²
    pub r_squared: f64,
    /// Parameter uncertainties, `None` if the covariance is singular
    pub errors: Option<ParameterErrors>,
}

impl HarmonicFit {
    /// Model values on the residual time base.
    pub fn fitted(&self) -> TimeSeries {
        let times = self.residuals.times();
        let values = self.parameters.reconstruct(&times);
        TimeSeries::new(&times, &values)
    }

    /// Root mean square of the residuals.
    pub fn residual_rms(&self) -> f64 {
        let n = self.residuals.len();
        if n == 0 {
            return 0.0;
        }
        let sum_sq: f64 = self.residuals.data.iter().map(|p| p.value * p.value).sum();
        (sum_sq / n as f64).sqrt()
    }
}

/// Starting point for the nonlinear solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InitialGuess {
    /// A₀ = half the peak-to-peak range, φ₀ = 0, C₀ = mean
    #[default]
    Range,
    /// Linear least-squares cosine/sine decomposition at the fixed period
    Linear,
}

/// Fixed-period harmonic fitter.
#[derive(Clone, Debug)]
pub struct HarmonicFitter {
    /// Constituent period in hours
    pub period_hours: f64,
    /// Maximum solver iterations (accepted plus rejected steps)
    pub max_iterations: usize,
    /// Stop when an accepted step reduces the residual sum of squares by
    /// less than this fraction
    pub ftol: f64,
    /// Stop when the step is this small relative to the parameter norm
    pub xtol: f64,
    /// Initial guess strategy
    pub initial_guess: InitialGuess,
}

impl Default for HarmonicFitter {
    fn default() -> Self {
        Self::m2()
    }
}

impl HarmonicFitter {
    /// Fitter for the M2 period (12.4206 h).
    pub fn m2() -> Self {
        Self::with_period_hours(M2_PERIOD_HOURS)
    }

    /// Fitter for an arbitrary fixed period.
    pub fn with_period_hours(period_hours: f64) -> Self {
        Self {
            period_hours,
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            initial_guess: InitialGuess::Range,
        }
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set convergence tolerances.
    pub fn with_tolerances(mut self, ftol: f64, xtol: f64) -> Self {
        self.ftol = ftol;
        self.xtol = xtol;
        self
    }

    /// Set the initial guess strategy.
    pub fn with_initial_guess(mut self, initial_guess: InitialGuess) -> Self {
        self.initial_guess = initial_guess;
        self
    }

    /// Angular frequency in radians per day.
    pub fn angular_frequency(&self) -> f64 {
        angular_frequency(self.period_hours)
    }

    /// Fit A cos(ωt − φ) + C to a series with time in days.
    ///
    /// # Errors
    ///
    /// Fails on non-finite samples, fewer than 4 samples, a constant series,
    /// an invalid period, sample times that alias the period, or when the
    /// solver does not converge.
    pub fn fit(&self, series: &TimeSeries) -> Result<HarmonicFit, FitError> {
        let n = series.len();
        if n < MIN_POINTS {
            return Err(FitError::InsufficientData {
                expected: MIN_POINTS,
                got: n,
            });
        }
        if let Some(index) = series.first_non_finite() {
            return Err(FitError::NonFiniteInput { index });
        }
        if !(self.period_hours.is_finite() && self.period_hours > 0.0) {
            return Err(FitError::InvalidPeriod(self.period_hours));
        }
        let range = series.peak_to_peak();
        if range <= 0.0 {
            return Err(FitError::ZeroVariance);
        }

        let times = series.times();
        let values = series.values();
        let omega = self.angular_frequency();
        if sampling_determinant(&times, omega) < MIN_SAMPLING_DETERMINANT {
            return Err(FitError::Degenerate);
        }

        let mut p = match self.initial_guess {
            InitialGuess::Range => [0.5 * range, 0.0, series.mean()],
            InitialGuess::Linear => linear_guess(&times, &values, omega)
                .unwrap_or([0.5 * range, 0.0, series.mean()]),
        };
        let mut ssr = sum_of_squares(&times, &values, omega, &p);
        let mut lambda = LAMBDA_INITIAL;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            if ssr == 0.0 {
                converged = true;
                break;
            }

            let (jtj, jtr) = normal_equations(&times, &values, omega, &p);
            let Some(step) = solve_damped(&jtj, &jtr, lambda) else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
                continue;
            };

            if norm(&step) <= self.xtol * (norm(&p) + self.xtol) {
                converged = true;
                break;
            }

            let trial = [p[0] + step[0], p[1] + step[1], p[2] + step[2]];
            let trial_ssr = sum_of_squares(&times, &values, omega, &trial);

            if trial_ssr.is_finite() && trial_ssr < ssr {
                let reduction = (ssr - trial_ssr) / ssr;
                p = trial;
                ssr = trial_ssr;
                lambda = (lambda / 10.0).max(LAMBDA_MIN);
                debug!(iterations, ssr, lambda, "accepted step");
                if reduction <= self.ftol {
                    converged = true;
                    break;
                }
            } else {
                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    break;
                }
            }
        }

        if !converged {
            return Err(FitError::NotConverged { iterations });
        }
        if !p.iter().all(|v| v.is_finite()) {
            return Err(FitError::Diverged);
        }

        let errors = parameter_errors(&times, &values, omega, &p, ssr);

        // Fold sign into phase so the amplitude is non-negative
        let (amplitude, phase) = if p[0] < 0.0 {
            (-p[0], p[1] + PI)
        } else {
            (p[0], p[1])
        };
        let parameters = HarmonicParameters::new(amplitude, phase, p[2], self.period_hours);

        let residual_points: Vec<TimeSeriesPoint> = series
            .data
            .iter()
            .map(|pt| TimeSeriesPoint {
                time: pt.time,
                value: pt.value - parameters.evaluate(pt.time),
            })
            .collect();
        let residuals = TimeSeries::from_points(residual_points).with_metadata_of(series);

        let residual_variance = ssr / (n - 1) as f64;
        let total_variance = series.variance();
        let r_squared = if total_variance > 1e-300 {
            1.0 - residual_variance / total_variance
        } else {
            1.0
        };

        debug!(
            amplitude = parameters.amplitude,
            phase = parameters.phase,
            offset = parameters.offset,
            iterations,
            r_squared,
            "harmonic fit converged"
        );

        Ok(HarmonicFit {
            parameters,
            residuals,
            iterations,
            residual_variance,
            r_squared,
            errors,
        })
    }
}

fn angular_frequency(period_hours: f64) -> f64 {
    2.0 * PI * 24.0 / period_hours
}

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn sum_of_squares(times: &[f64], values: &[f64], omega: f64, p: &[f64; 3]) -> f64 {
    times
        .iter()
        .zip(values)
        .map(|(&t, &y)| {
            let r = y - (p[0] * (omega * t - p[1]).cos() + p[2]);
            r * r
        })
        .sum()
}

/// Accumulate JᵀJ and Jᵀr for the current parameters.
fn normal_equations(
    times: &[f64],
    values: &[f64],
    omega: f64,
    p: &[f64; 3],
) -> ([[f64; 3]; 3], [f64; 3]) {
    let mut jtj = [[0.0; 3]; 3];
    let mut jtr = [0.0; 3];

    for (&t, &y) in times.iter().zip(values) {
        let arg = omega * t - p[1];
        let (s, c) = arg.sin_cos();
        let r = y - (p[0] * c + p[2]);
        let row = [c, p[0] * s, 1.0];

        for i in 0..3 {
            jtr[i] += row[i] * r;
            for j in 0..3 {
                jtj[i][j] += row[i] * row[j];
            }
        }
    }

    (jtj, jtr)
}

/// Solve (JᵀJ + λ D) δ = Jᵀr with Marquardt scaling D = diag(JᵀJ).
fn solve_damped(jtj: &[[f64; 3]; 3], jtr: &[f64; 3], lambda: f64) -> Option<[f64; 3]> {
    let max_diag = (0..3).map(|i| jtj[i][i]).fold(0.0, f64::max);
    let floor = (max_diag * 1e-12).max(f64::MIN_POSITIVE);

    let mut a = Mat::<f64>::zeros(3, 3);
    let mut b = Mat::<f64>::zeros(3, 1);
    for i in 0..3 {
        for j in 0..3 {
            a[(i, j)] = jtj[i][j];
        }
        a[(i, i)] += lambda * jtj[i][i].max(floor);
        b[(i, 0)] = jtr[i];
    }

    let lu = a.as_ref().full_piv_lu();
    let x = lu.solve(&b);
    let step = [x[(0, 0)], x[(1, 0)], x[(2, 0)]];
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// Determinant of the Gram matrix of [1, cos ωt, sin ωt], scaled so a
/// record of whole, evenly sampled cycles gives 1.
///
/// Drops to zero when the sample times cannot tell the columns apart, as
/// with one sample per period where cos ωt ≡ 1 and sin ωt ≡ 0.
fn sampling_determinant(times: &[f64], omega: f64) -> f64 {
    let mut g = [[0.0; 3]; 3];
    for &t in times {
        let (s, c) = (omega * t).sin_cos();
        let row = [1.0, c, s];
        for i in 0..3 {
            for j in 0..3 {
                g[i][j] += row[i] * row[j];
            }
        }
    }

    let n = times.len() as f64;
    let g = g.map(|r| r.map(|v| v / n));
    let det = g[0][0] * (g[1][1] * g[2][2] - g[1][2] * g[2][1])
        - g[0][1] * (g[1][0] * g[2][2] - g[1][2] * g[2][0])
        + g[0][2] * (g[1][0] * g[2][1] - g[1][1] * g[2][0]);
    4.0 * det
}

/// One-sigma errors from diag((JᵀJ)⁻¹) · SSR / (n − 3).
fn parameter_errors(
    times: &[f64],
    values: &[f64],
    omega: f64,
    p: &[f64; 3],
    ssr: f64,
) -> Option<ParameterErrors> {
    let n = times.len();
    if n <= 3 {
        return None;
    }
    let (jtj, _) = normal_equations(times, values, omega, p);

    let mut a = Mat::<f64>::zeros(3, 3);
    for i in 0..3 {
        for j in 0..3 {
            a[(i, j)] = jtj[i][j];
        }
    }
    let inverse = a.as_ref().full_piv_lu().solve(&Mat::<f64>::identity(3, 3));

    let sigma_sq = ssr / (n - 3) as f64;
    let err = |i: usize| {
        let v = inverse[(i, i)] * sigma_sq;
        (v.is_finite() && v >= 0.0).then(|| v.sqrt())
    };

    Some(ParameterErrors {
        amplitude: err(0)?,
        phase: err(1)?,
        offset: err(2)?,
    })
}

/// Linear least squares on y = C + a cos(ωt) + b sin(ωt).
///
/// Since A cos(ωt − φ) = A cos φ cos(ωt) + A sin φ sin(ωt), the amplitude is
/// √(a² + b²) and the phase atan2(b, a).
fn linear_guess(times: &[f64], values: &[f64], omega: f64) -> Option<[f64; 3]> {
    let n_data = times.len();

    // Design matrix columns [1, cos(ωt), sin(ωt)]
    let mut a = Mat::<f64>::zeros(n_data, 3);
    for (i, &t) in times.iter().enumerate() {
        let (s, c) = (omega * t).sin_cos();
        a[(i, 0)] = 1.0;
        a[(i, 1)] = c;
        a[(i, 2)] = s;
    }

    // Normal equations: (A'A) x = A'y
    let mut ata = Mat::<f64>::zeros(3, 3);
    let mut aty = Mat::<f64>::zeros(3, 1);
    for i in 0..3 {
        for j in 0..3 {
            let mut sum = 0.0;
            for k in 0..n_data {
                sum += a[(k, i)] * a[(k, j)];
            }
            ata[(i, j)] = sum;
        }
        let mut sum = 0.0;
        for k in 0..n_data {
            sum += a[(k, i)] * values[k];
        }
        aty[(i, 0)] = sum;
    }

    let x = ata.as_ref().full_piv_lu().solve(&aty);
    let (offset, a_coef, b_coef) = (x[(0, 0)], x[(1, 0)], x[(2, 0)]);
    if !(offset.is_finite() && a_coef.is_finite() && b_coef.is_finite()) {
        return None;
    }

    Some([a_coef.hypot(b_coef), b_coef.atan2(a_coef), offset])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::phase_difference;

    const TOL: f64 = 1e-3;

    /// Hourly samples over `days` days.
    fn synthetic(params: &HarmonicParameters, days: usize, samples_per_day: usize) -> TimeSeries {
        let times: Vec<f64> = (0..days * samples_per_day)
            .map(|i| i as f64 / samples_per_day as f64)
            .collect();
        let values = params.reconstruct(&times);
        TimeSeries::new(&times, &values)
    }

    #[test]
    fn test_noiseless_recovery() {
        let truth = HarmonicParameters::m2(0.5, 1.0, 10.0);
        let series = synthetic(&truth, 30, 24);

        let fit = HarmonicFitter::m2().fit(&series).unwrap();
        let p = fit.parameters;

        assert!(
            (p.amplitude - 0.5).abs() < TOL,
            "Amplitude error: expected 0.5, got {}",
            p.amplitude
        );
        assert!(
            phase_difference(p.phase, 1.0).abs() < TOL,
            "Phase error: expected 1.0, got {}",
            p.phase
        );
        assert!(
            (p.offset - 10.0).abs() < TOL,
            "Offset error: expected 10.0, got {}",
            p.offset
        );
        assert!(fit.r_squared > 0.9999);
    }

    #[test]
    fn test_noiseless_residuals_vanish() {
        let truth = HarmonicParameters::m2(1.5, 2.5, -3.0);
        let series = synthetic(&truth, 10, 48);

        let fit = HarmonicFitter::m2().fit(&series).unwrap();

        assert_eq!(fit.residuals.len(), series.len());
        for p in &fit.residuals.data {
            assert!(p.value.abs() < 1e-6, "Residual {} at t={}", p.value, p.time);
        }
        assert!(fit.residual_rms() < 1e-6);
    }

    #[test]
    fn test_phase_wrapped_to_positive_range() {
        // Phase near 2π - 0.78 must come back in [0, 2π)
        let truth = HarmonicParameters::m2(0.8, -0.78, 0.0);
        let series = synthetic(&truth, 15, 24);

        let fit = HarmonicFitter::m2().fit(&series).unwrap();
        let phase = fit.parameters.phase;

        assert!((0.0..2.0 * PI).contains(&phase), "Phase {} not in [0, 2π)", phase);
        assert!(phase_difference(phase, 2.0 * PI - 0.78).abs() < TOL);
    }

    #[test]
    fn test_opposite_phase_gives_positive_amplitude() {
        // Starting at φ₀ = 0 against a signal at φ = 3.0 drives A negative
        let truth = HarmonicParameters::m2(1.0, 3.0, 5.0);
        let series = synthetic(&truth, 15, 24);

        let fit = HarmonicFitter::m2().fit(&series).unwrap();

        assert!(fit.parameters.amplitude > 0.0);
        assert!((fit.parameters.amplitude - 1.0).abs() < TOL);
        assert!(phase_difference(fit.parameters.phase, 3.0).abs() < TOL);
    }

    #[test]
    fn test_linear_initial_guess_agrees() {
        let truth = HarmonicParameters::m2(0.3, 4.0, 35.0);
        let series = synthetic(&truth, 20, 24);

        let range_fit = HarmonicFitter::m2().fit(&series).unwrap();
        let linear_fit = HarmonicFitter::m2()
            .with_initial_guess(InitialGuess::Linear)
            .fit(&series)
            .unwrap();

        assert!((range_fit.parameters.amplitude - linear_fit.parameters.amplitude).abs() < 1e-6);
        assert!(phase_difference(range_fit.parameters.phase, linear_fit.parameters.phase).abs() < 1e-6);
        // Linear guess is already the optimum for a noiseless cosine
        assert!(linear_fit.iterations <= range_fit.iterations);
    }

    #[test]
    fn test_custom_period() {
        let truth = HarmonicParameters::new(2.0, 0.5, 1.0, 23.9345);
        let series = synthetic(&truth, 30, 24);

        let fit = HarmonicFitter::with_period_hours(23.9345).fit(&series).unwrap();

        assert!((fit.parameters.amplitude - 2.0).abs() < TOL);
        assert!((fit.parameters.period_hours - 23.9345).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let truth = HarmonicParameters::m2(1.0, 0.0, 0.0);
        let mut series = synthetic(&truth, 2, 24);
        series.data[7].value = f64::NAN;

        let err = HarmonicFitter::m2().fit(&series).unwrap_err();
        assert_eq!(err, FitError::NonFiniteInput { index: 7 });
    }

    #[test]
    fn test_insufficient_data() {
        let series = TimeSeries::new(&[0.0, 0.1, 0.2], &[1.0, 2.0, 1.0]);
        let err = HarmonicFitter::m2().fit(&series).unwrap_err();
        assert_eq!(err, FitError::InsufficientData { expected: 4, got: 3 });
    }

    #[test]
    fn test_constant_series_is_an_error() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 / 24.0).collect();
        let series = TimeSeries::new(&times, &vec![34.5; 100]);

        let err = HarmonicFitter::m2().fit(&series).unwrap_err();
        assert_eq!(err, FitError::ZeroVariance);
    }

    #[test]
    fn test_once_per_period_sampling_is_degenerate() {
        // One sample per M2 cycle sees the same tidal phase every time
        let times: Vec<f64> = (0..60)
            .map(|k| k as f64 * M2_PERIOD_HOURS / 24.0)
            .collect();
        let values: Vec<f64> = (0..60)
            .map(|k| 34.0 + 0.01 * ((k * 7919) % 13) as f64 / 13.0)
            .collect();
        let series = TimeSeries::new(&times, &values);

        for guess in [InitialGuess::Range, InitialGuess::Linear] {
            let err = HarmonicFitter::m2()
                .with_initial_guess(guess)
                .fit(&series)
                .unwrap_err();
            assert_eq!(err, FitError::Degenerate, "{:?}", guess);
        }
    }

    #[test]
    fn test_sampling_determinant() {
        let omega = HarmonicFitter::m2().angular_frequency();

        // Hourly over whole days is close to orthogonal
        let hourly: Vec<f64> = (0..30 * 24).map(|i| i as f64 / 24.0).collect();
        let det = sampling_determinant(&hourly, omega);
        assert!((det - 1.0).abs() < 0.05, "hourly determinant {}", det);

        // A short burst well inside one cycle is still separable
        let burst: Vec<f64> = (0..12).map(|i| i as f64 / 96.0).collect();
        assert!(sampling_determinant(&burst, omega) > MIN_SAMPLING_DETERMINANT);

        let aliased: Vec<f64> = (0..60)
            .map(|k| k as f64 * M2_PERIOD_HOURS / 24.0)
            .collect();
        assert!(sampling_determinant(&aliased, omega) < MIN_SAMPLING_DETERMINANT);
    }

    #[test]
    fn test_invalid_period() {
        let truth = HarmonicParameters::m2(1.0, 0.0, 0.0);
        let series = synthetic(&truth, 2, 24);

        let err = HarmonicFitter::with_period_hours(0.0).fit(&series).unwrap_err();
        assert_eq!(err, FitError::InvalidPeriod(0.0));
    }

    #[test]
    fn test_iteration_budget_reports_failure() {
        let truth = HarmonicParameters::m2(1.0, 2.0, 3.0);
        let series = synthetic(&truth, 10, 24);

        let err = HarmonicFitter::m2()
            .with_max_iterations(1)
            .fit(&series)
            .unwrap_err();
        assert_eq!(err, FitError::NotConverged { iterations: 1 });
    }

    #[test]
    fn test_parameter_errors_small_for_clean_data() {
        let truth = HarmonicParameters::m2(1.0, 1.0, 0.0);
        let mut series = synthetic(&truth, 15, 24);
        // Deterministic small perturbation so the covariance is non-degenerate
        for (i, p) in series.data.iter_mut().enumerate() {
            p.value += 0.01 * ((i * 7919) % 13) as f64 / 13.0 - 0.005;
        }

        let fit = HarmonicFitter::m2().fit(&series).unwrap();
        let errors = fit.errors.expect("covariance should be invertible");

        assert!(errors.amplitude > 0.0 && errors.amplitude < 0.01);
        assert!(errors.phase > 0.0 && errors.phase < 0.01);
        assert!(errors.offset > 0.0 && errors.offset < 0.01);
    }

    #[test]
    fn test_fitted_series_matches_parameters() {
        let truth = HarmonicParameters::m2(0.5, 0.2, 1.0);
        let series = synthetic(&truth, 5, 24);
        let fit = HarmonicFitter::m2().fit(&series).unwrap();

        let fitted = fit.fitted();
        assert_eq!(fitted.len(), series.len());
        for (f, o) in fitted.data.iter().zip(&series.data) {
            assert!((f.value - o.value).abs() < 1e-6);
        }
    }

    #[test]
    fn test_parameters_evaluate() {
        let p = HarmonicParameters::m2(2.0, 0.0, 1.0);
        assert!((p.evaluate(0.0) - 3.0).abs() < 1e-12);
        // Half a period later the cosine is at its minimum
        assert!((p.evaluate(p.period_days() / 2.0) - (-1.0)).abs() < 1e-9);
        // Phase lag shifts the maximum later in time
        let lagged = HarmonicParameters::m2(1.0, PI / 2.0, 0.0);
        assert!((lagged.evaluate(lagged.period_days() / 4.0) - 1.0).abs() < 1e-9);
    }
}
