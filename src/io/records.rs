//! Raw mooring records as read from disk.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::analysis::{CfTimeUnits, TimeUnit};

/// CTD record: practical salinity, in-situ temperature and sea pressure.
#[derive(Clone, Debug)]
pub struct CtdRecord {
    /// Station or mooring name
    pub station: String,
    /// Instrument position (longitude, latitude) in degrees
    pub position: Option<(f64, f64)>,
    /// Reference epoch of `time`
    pub epoch: NaiveDateTime,
    /// Time in seconds since `epoch`
    pub time: Vec<f64>,
    /// Practical salinity PSAL (PSS-78)
    pub practical_salinity: Vec<f64>,
    /// In-situ temperature TEMP (°C)
    pub temperature: Vec<f64>,
    /// Sea pressure PRES (dbar)
    pub pressure: Vec<f64>,
    /// Additional metadata from the file
    pub metadata: HashMap<String, String>,
}

impl CtdRecord {
    /// Create a record with time in Unix seconds.
    ///
    /// # Panics
    /// Panics if the arrays have different lengths.
    pub fn new(
        station: impl Into<String>,
        time: Vec<f64>,
        practical_salinity: Vec<f64>,
        temperature: Vec<f64>,
        pressure: Vec<f64>,
    ) -> Self {
        let n = time.len();
        assert_eq!(practical_salinity.len(), n, "time and PSAL must have same length");
        assert_eq!(temperature.len(), n, "time and TEMP must have same length");
        assert_eq!(pressure.len(), n, "time and PRES must have same length");

        Self {
            station: station.into(),
            position: None,
            epoch: NaiveDateTime::UNIX_EPOCH,
            time,
            practical_salinity,
            temperature,
            pressure,
            metadata: HashMap::new(),
        }
    }

    /// Set the instrument position.
    pub fn with_position(mut self, longitude: f64, latitude: f64) -> Self {
        self.position = Some((longitude, latitude));
        self
    }

    /// Set the time reference epoch.
    pub fn with_epoch(mut self, epoch: NaiveDateTime) -> Self {
        self.epoch = epoch;
        self
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time units of the `time` array.
    pub fn time_units(&self) -> CfTimeUnits {
        seconds_since(self.epoch)
    }

    /// Calendar time of the first sample.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.time
            .first()
            .and_then(|&t| self.time_units().to_datetime(t))
    }
}

/// Current meter record: eastward and northward velocity.
#[derive(Clone, Debug)]
pub struct VelocityRecord {
    /// Station or mooring name
    pub station: String,
    /// Instrument position (longitude, latitude) in degrees
    pub position: Option<(f64, f64)>,
    /// Reference epoch of `time`
    pub epoch: NaiveDateTime,
    /// Time in seconds since `epoch`
    pub time: Vec<f64>,
    /// Eastward velocity UVEL (m/s)
    pub u: Vec<f64>,
    /// Northward velocity VVEL (m/s)
    pub v: Vec<f64>,
    /// Additional metadata from the file
    pub metadata: HashMap<String, String>,
}

impl VelocityRecord {
    /// Create a record with time in Unix seconds.
    ///
    /// # Panics
    /// Panics if the arrays have different lengths.
    pub fn new(station: impl Into<String>, time: Vec<f64>, u: Vec<f64>, v: Vec<f64>) -> Self {
        assert_eq!(u.len(), time.len(), "time and UVEL must have same length");
        assert_eq!(v.len(), time.len(), "time and VVEL must have same length");

        Self {
            station: station.into(),
            position: None,
            epoch: NaiveDateTime::UNIX_EPOCH,
            time,
            u,
            v,
            metadata: HashMap::new(),
        }
    }

    /// Set the instrument position.
    pub fn with_position(mut self, longitude: f64, latitude: f64) -> Self {
        self.position = Some((longitude, latitude));
        self
    }

    /// Set the time reference epoch.
    pub fn with_epoch(mut self, epoch: NaiveDateTime) -> Self {
        self.epoch = epoch;
        self
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time units of the `time` array.
    pub fn time_units(&self) -> CfTimeUnits {
        seconds_since(self.epoch)
    }

    /// Calendar time of the first sample.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.time
            .first()
            .and_then(|&t| self.time_units().to_datetime(t))
    }
}

fn seconds_since(epoch: NaiveDateTime) -> CfTimeUnits {
    CfTimeUnits {
        unit: TimeUnit::Seconds,
        epoch,
    }
}
