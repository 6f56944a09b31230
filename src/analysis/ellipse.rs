//! Tidal current ellipses from a pair of U/V harmonic fits.
//!
//! # Mathematical Background
//!
//! With each velocity component fitted as `A cos(ωt − φ)`, the complex
//! amplitudes are
//! ```text
//! aᵤ = Aᵤ e^{-iφᵤ},   aᵥ = Aᵥ e^{-iφᵥ}
//! ```
//! and the complex velocity w = u + iv splits into two counter-rotating
//! circular components:
//! ```text
//! w(t) = W⁺ e^{i(ωt + θ⁺)} + W⁻ e^{-i(ωt − θ⁻)}
//! W⁺ e^{iθ⁺} = ½ (aᵤ + i aᵥ)          (counter-clockwise)
//! W⁻ e^{iθ⁻} = ½ (āᵤ + i āᵥ)          (clockwise)
//! ```
//!
//! The ellipse follows directly:
//! - semi-major axis  W⁺ + W⁻
//! - semi-minor axis  W⁺ − W⁻ (negative for clockwise rotation)
//! - inclination      (θ⁺ + θ⁻) / 2, counter-clockwise from East, in [0, π)
//! - phase            (θ⁻ − θ⁺) / 2, the value of ωt at maximum current

use super::{HarmonicParameters, wrap_phase};
use std::f64::consts::PI;
use thiserror::Error;

/// Amplitudes below this are treated as no current at all.
const DEGENERATE_AMPLITUDE: f64 = 1e-12;

/// Error type for ellipse computation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EllipseError {
    #[error("U and V fits use different periods: {u_hours} h vs {v_hours} h")]
    PeriodMismatch { u_hours: f64, v_hours: f64 },

    #[error("non-finite harmonic parameters")]
    NonFinite,
}

/// Sense of rotation of the current vector around the ellipse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    CounterClockwise,
    Clockwise,
    /// Degenerate ellipse, flow back and forth along a line
    Rectilinear,
}

/// Tidal current ellipse for one constituent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TidalEllipse {
    /// Semi-major axis (velocity units), non-negative
    pub semi_major: f64,
    /// Semi-minor axis, positive when the vector rotates counter-clockwise
    pub semi_minor: f64,
    /// Direction of the major axis, radians counter-clockwise from East, [0, π)
    pub inclination: f64,
    /// Phase of maximum current along the inclination, radians [0, 2π)
    pub phase: f64,
    /// Constituent period in hours
    pub period_hours: f64,
}

impl TidalEllipse {
    /// Build the ellipse from U (eastward) and V (northward) fits.
    ///
    /// Only amplitude, phase and period are used; the offsets (mean flow)
    /// do not enter the ellipse.
    pub fn from_fits(
        u: &HarmonicParameters,
        v: &HarmonicParameters,
    ) -> Result<Self, EllipseError> {
        let values = [u.amplitude, u.phase, v.amplitude, v.phase];
        if !values.iter().all(|x| x.is_finite()) {
            return Err(EllipseError::NonFinite);
        }
        if (u.period_hours - v.period_hours).abs() > 1e-9 * u.period_hours.abs().max(1.0) {
            return Err(EllipseError::PeriodMismatch {
                u_hours: u.period_hours,
                v_hours: v.period_hours,
            });
        }

        let period_hours = u.period_hours;
        if u.amplitude.abs() < DEGENERATE_AMPLITUDE && v.amplitude.abs() < DEGENERATE_AMPLITUDE {
            return Ok(Self {
                semi_major: 0.0,
                semi_minor: 0.0,
                inclination: 0.0,
                phase: 0.0,
                period_hours,
            });
        }

        // aᵤ = Aᵤ e^{-iφᵤ}
        let (au_re, au_im) = (u.amplitude * u.phase.cos(), -u.amplitude * u.phase.sin());
        let (av_re, av_im) = (v.amplitude * v.phase.cos(), -v.amplitude * v.phase.sin());

        // aᵤ + i aᵥ
        let (p_re, p_im) = (au_re - av_im, au_im + av_re);
        // āᵤ + i āᵥ
        let (m_re, m_im) = (au_re + av_im, -au_im + av_re);

        let w_plus = 0.5 * p_re.hypot(p_im);
        let w_minus = 0.5 * m_re.hypot(m_im);
        let theta_plus = p_im.atan2(p_re);
        let theta_minus = m_im.atan2(m_re);

        let mut inclination = 0.5 * (theta_plus + theta_minus);
        let mut phase = 0.5 * (theta_minus - theta_plus);

        // Turning the major axis by π is the same as shifting the phase by π
        if inclination < 0.0 {
            inclination += PI;
            phase += PI;
        } else if inclination >= PI {
            inclination -= PI;
            phase -= PI;
        }

        Ok(Self {
            semi_major: w_plus + w_minus,
            semi_minor: w_plus - w_minus,
            inclination,
            phase: wrap_phase(phase),
            period_hours,
        })
    }

    /// Counter-clockwise and clockwise rotary amplitudes (W⁺, W⁻).
    pub fn rotary_components(&self) -> (f64, f64) {
        (
            0.5 * (self.semi_major + self.semi_minor),
            0.5 * (self.semi_major - self.semi_minor),
        )
    }

    /// Sense of rotation.
    pub fn rotation(&self) -> Rotation {
        if self.semi_minor.abs() <= 1e-9 * self.semi_major {
            Rotation::Rectilinear
        } else if self.semi_minor > 0.0 {
            Rotation::CounterClockwise
        } else {
            Rotation::Clockwise
        }
    }

    /// |minor| / major, 0 for a collapsed ellipse.
    pub fn axis_ratio(&self) -> f64 {
        if self.semi_major > 0.0 {
            self.semi_minor.abs() / self.semi_major
        } else {
            0.0
        }
    }

    /// Eccentricity √(1 − (b/a)²).
    pub fn eccentricity(&self) -> f64 {
        let r = self.axis_ratio();
        (1.0 - r * r).max(0.0).sqrt()
    }

    /// Inclination in degrees [0, 180).
    pub fn inclination_degrees(&self) -> f64 {
        self.inclination.to_degrees()
    }

    /// Phase in degrees [0, 360).
    pub fn phase_degrees(&self) -> f64 {
        self.phase.to_degrees()
    }

    /// Tidal velocity (u, v) at time t (days), without the mean flow.
    pub fn velocity_at(&self, t: f64) -> (f64, f64) {
        let omega = 2.0 * PI * 24.0 / self.period_hours;
        self.velocity_at_angle(omega * t - self.phase)
    }

    /// `n` points around the ellipse starting at maximum current.
    pub fn outline(&self, n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|k| self.velocity_at_angle(2.0 * PI * k as f64 / n as f64))
            .collect()
    }

    fn velocity_at_angle(&self, angle: f64) -> (f64, f64) {
        let along = self.semi_major * angle.cos();
        let across = self.semi_minor * angle.sin();
        let (s, c) = self.inclination.sin_cos();
        (along * c - across * s, along * s + across * c)
    }
}
