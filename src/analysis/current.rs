//! Current meter velocity series.
//!
//! A [`CurrentTimeSeries`] holds (time, u, v) samples from a single current
//! meter. For harmonic analysis it is split into independent U and V
//! [`TimeSeries`], fitted separately and recombined into a
//! [`TidalEllipse`](super::TidalEllipse).

use super::TimeSeries;

/// A single current measurement point (u, v at time t).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurrentPoint {
    /// Time (fractional days once normalized)
    pub time: f64,
    /// Eastward velocity component (m/s)
    pub u: f64,
    /// Northward velocity component (m/s)
    pub v: f64,
}

impl CurrentPoint {
    /// Create a new current measurement point.
    pub fn new(time: f64, u: f64, v: f64) -> Self {
        Self { time, u, v }
    }

    /// Compute current speed.
    #[inline]
    pub fn speed(&self) -> f64 {
        self.u.hypot(self.v)
    }

    /// Compute current direction in radians (0 = East, π/2 = North).
    #[inline]
    pub fn direction(&self) -> f64 {
        self.v.atan2(self.u)
    }

    /// Direction the current flows towards in oceanographic convention
    /// (degrees clockwise from North, [0, 360)).
    #[inline]
    pub fn direction_oceanographic(&self) -> f64 {
        let dir = 90.0 - self.direction().to_degrees();
        dir.rem_euclid(360.0)
    }
}

/// Time series of current velocity measurements.
///
/// Stores (time, u, v) triplets with optional location and name.
#[derive(Clone, Debug)]
pub struct CurrentTimeSeries {
    /// The current data points
    pub data: Vec<CurrentPoint>,
    /// Optional (longitude, latitude) of the instrument
    pub location: Option<(f64, f64)>,
    /// Optional name/identifier
    pub name: Option<String>,
}

impl CurrentTimeSeries {
    /// Create a new current time series from parallel arrays.
    ///
    /// # Panics
    /// Panics if arrays have different lengths.
    pub fn new(times: &[f64], u: &[f64], v: &[f64]) -> Self {
        assert_eq!(times.len(), u.len(), "times and u must have same length");
        assert_eq!(times.len(), v.len(), "times and v must have same length");

        let data = times
            .iter()
            .zip(u)
            .zip(v)
            .map(|((&t, &u), &v)| CurrentPoint::new(t, u, v))
            .collect();

        Self {
            data,
            location: None,
            name: None,
        }
    }

    /// Set location (longitude, latitude).
    pub fn with_location(mut self, longitude: f64, latitude: f64) -> Self {
        self.location = Some((longitude, latitude));
        self
    }

    /// Set name/identifier.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Number of data points.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty.
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

    /// Get u-component as a vector.
    pub fn u_values(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.u).collect()
    }

    /// Get v-component as a vector.
    pub fn v_values(&self) -> Vec<f64> {
        self.data.iter().map(|p| p.v).collect()
    }

    /// Eastward component as a scalar series named `"<name> U"`.
    pub fn u_series(&self) -> TimeSeries {
        self.component(&self.u_values(), "U")
    }

    /// Northward component as a scalar series named `"<name> V"`.
    pub fn v_series(&self) -> TimeSeries {
        self.component(&self.v_values(), "V")
    }

    fn component(&self, values: &[f64], label: &str) -> TimeSeries {
        let mut series = TimeSeries::new(&self.times(), values);
        series.location = self.location;
        series.name = Some(match &self.name {
            Some(name) => format!("{} {}", name, label),
            None => label.to_string(),
        });
        series
    }

    /// Mean of the sample speeds, zero for an empty series.
    pub fn mean_speed(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|p| p.speed()).sum::<f64>() / self.data.len() as f64
    }
}
