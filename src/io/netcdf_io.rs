//! NetCDF readers for mooring records.
//!
//! Reads single-instrument time series in the layout used by OceanSITES and
//! similar CF-conventions mooring archives:
//!
//! - Time coordinate `time`/`TIME` with a CF `units` attribute
//! - CTD variables `PSAL`, `TEMP`, `PRES`
//! - Velocity variables `UVEL`, `VVEL`
//! - Position in `LATITUDE`/`latitude`/`lat` and `LONGITUDE`/`longitude`/`lon`
//!   variables, or `geospatial_lat_min`/`geospatial_lon_min` global attributes
//!
//! Variables with extra dimensions (e.g. `PSAL(TIME, DEPTH)`) are read at the
//! first index of the trailing dimensions. Packed data is unpacked with
//! `scale_factor`/`add_offset`; `_FillValue` and |x| ≥ 1e30 become NaN.
//!
//! # Example
//!
//! ```rust,ignore
//! use mooring_rs::io::{read_ctd_netcdf, read_velocity_netcdf};
//!
//! let ctd = read_ctd_netcdf(Path::new("OS_M1_CTD.nc"))?;
//! let vel = read_velocity_netcdf(Path::new("OS_M1_VEL.nc"))?;
//! ```

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use super::{CtdRecord, VelocityRecord};
use crate::analysis::{CfTimeUnits, TimeError};

/// Error type for NetCDF operations.
#[derive(Debug, Error)]
pub enum NetCDFError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing variable
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// Time `units` attribute could not be interpreted
    #[error("Time units: {0}")]
    TimeUnits(#[from] TimeError),
}

/// Fill value for missing data (CF-conventions standard).
pub const FILL_VALUE_F64: f64 = 9.96920996838687e+36;

/// Check if a value is valid (not a fill value).
#[inline]
pub fn is_valid_f64(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e+30
}

const TIME_NAMES: [&str; 2] = ["time", "TIME"];
const LATITUDE_NAMES: [&str; 3] = ["LATITUDE", "latitude", "lat"];
const LONGITUDE_NAMES: [&str; 3] = ["LONGITUDE", "longitude", "lon"];

/// Read a CTD record (PSAL, TEMP, PRES) from a NetCDF file.
pub fn read_ctd_netcdf(path: &Path) -> Result<CtdRecord, NetCDFError> {
    let file = netcdf::open(path)?;
    let (time, units, time_dim) = read_time(&file)?;
    let axis = (time_dim.as_str(), time.len());

    let psal = read_series(&file, &["PSAL", "sea_water_practical_salinity"], axis)?;
    let temp = read_series(&file, &["TEMP", "sea_water_temperature"], axis)?;
    let pres = read_series(&file, &["PRES", "sea_water_pressure"], axis)?;

    let mut record = CtdRecord::new(station_name(&file, path), time, psal, temp, pres)
        .with_epoch(units.epoch);
    record.position = read_position(&file);
    record.metadata = global_metadata(&file);
    Ok(record)
}

/// Read a velocity record (UVEL, VVEL) from a NetCDF file.
pub fn read_velocity_netcdf(path: &Path) -> Result<VelocityRecord, NetCDFError> {
    let file = netcdf::open(path)?;
    let (time, units, time_dim) = read_time(&file)?;
    let axis = (time_dim.as_str(), time.len());

    let u = read_series(&file, &["UVEL", "eastward_sea_water_velocity"], axis)?;
    let v = read_series(&file, &["VVEL", "northward_sea_water_velocity"], axis)?;

    let mut record =
        VelocityRecord::new(station_name(&file, path), time, u, v).with_epoch(units.epoch);
    record.position = read_position(&file);
    record.metadata = global_metadata(&file);
    Ok(record)
}

/// Read the time coordinate, converted to seconds since its epoch, along
/// with the name of the dimension it runs along.
fn read_time(file: &netcdf::File) -> Result<(Vec<f64>, CfTimeUnits, String), NetCDFError> {
    let var = TIME_NAMES
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| NetCDFError::MissingVariable("time".to_string()))?;

    let units = match get_attr_str(&var, "units") {
        Some(s) => CfTimeUnits::parse(&s)?,
        None => CfTimeUnits::unix_seconds(),
    };

    let raw: Vec<f64> = var.get_values(..)?;
    if raw.is_empty() {
        return Err(NetCDFError::InvalidData("time coordinate is empty".to_string()));
    }
    let seconds = raw.iter().map(|&t| units.to_seconds(t)).collect();
    let dimension = var
        .dimensions()
        .first()
        .map(|d| d.name())
        .unwrap_or_else(|| var.name());
    Ok((seconds, units, dimension))
}

/// Read a time series variable with packed data and fill value handling.
///
/// `(time_dim, n_time)` names the time dimension and its length. Time must
/// be the leading dimension of the variable; trailing singleton or depth
/// dimensions are reduced to their first index.
fn read_series(
    file: &netcdf::File,
    names: &[&str],
    (time_dim, n_time): (&str, usize),
) -> Result<Vec<f64>, NetCDFError> {
    let var = names
        .iter()
        .find_map(|name| file.variable(name))
        .ok_or_else(|| NetCDFError::MissingVariable(names[0].to_string()))?;

    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    match dims.iter().position(|d| d == time_dim) {
        Some(0) => {}
        Some(i) => {
            return Err(NetCDFError::InvalidData(format!(
                "{} has {} at position {} of {:?}; time must be the leading dimension",
                names[0], time_dim, i, dims
            )));
        }
        None => {
            return Err(NetCDFError::InvalidData(format!(
                "{} does not vary along {} (dimensions {:?})",
                names[0], time_dim, dims
            )));
        }
    }

    let scale = get_attr_f64(&var, "scale_factor").unwrap_or(1.0);
    let offset = get_attr_f64(&var, "add_offset").unwrap_or(0.0);
    let fill = get_attr_f64(&var, "_FillValue").unwrap_or(FILL_VALUE_F64);

    let raw: Vec<f64> = var.get_values(..)?;
    if raw.len() < n_time || raw.len() % n_time != 0 {
        return Err(NetCDFError::InvalidData(format!(
            "{} has {} values for {} time steps",
            names[0],
            raw.len(),
            n_time
        )));
    }

    // Time leads, so each time step is a contiguous block; take its first value
    let stride = raw.len() / n_time;
    Ok(raw
        .iter()
        .step_by(stride)
        .map(|&v| {
            if v == fill || !is_valid_f64(v) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect())
}

fn read_position(file: &netcdf::File) -> Option<(f64, f64)> {
    let coord = |names: &[&str], attr: &str| -> Option<f64> {
        names
            .iter()
            .find_map(|name| file.variable(name))
            .and_then(|var| var.get_values::<f64, _>(..).ok())
            .and_then(|values| values.into_iter().find(|&v| is_valid_f64(v)))
            .or_else(|| global_attr_f64(file, attr))
    };

    let latitude = coord(&LATITUDE_NAMES, "geospatial_lat_min")?;
    let longitude = coord(&LONGITUDE_NAMES, "geospatial_lon_min")?;
    Some((longitude, latitude))
}

fn station_name(file: &netcdf::File, path: &Path) -> String {
    ["platform_code", "site_code", "station"]
        .iter()
        .find_map(|name| global_attr_str(file, name))
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// String-valued global attributes.
fn global_metadata(file: &netcdf::File) -> HashMap<String, String> {
    file.attributes()
        .filter_map(|attr| match attr.value() {
            Ok(netcdf::AttributeValue::Str(s)) => Some((attr.name().to_string(), s)),
            _ => None,
        })
        .collect()
}

/// Get f64 attribute value.
fn get_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            _ => None,
        })
}

/// Get string attribute value.
fn get_attr_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

fn global_attr_f64(file: &netcdf::File, name: &str) -> Option<f64> {
    file.attribute(name)
        .and_then(|a| a.value().ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        })
}

fn global_attr_str(file: &netcdf::File, name: &str) -> Option<String> {
    file.attribute(name)
        .and_then(|a| a.value().ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_velocity_file(path: &Path) {
        let mut file = netcdf::create(path).unwrap();
        file.add_attribute("platform_code", "M1").unwrap();
        file.add_dimension("TIME", 4).unwrap();
        file.add_dimension("LATITUDE", 1).unwrap();
        file.add_dimension("LONGITUDE", 1).unwrap();

        let mut time = file.add_variable::<f64>("TIME", &["TIME"]).unwrap();
        time.put_attribute("units", "hours since 2019-05-01 00:00:00")
            .unwrap();
        time.put_values(&[0.0, 1.0, 2.0, 3.0], ..).unwrap();

        let mut lat = file.add_variable::<f64>("LATITUDE", &["LATITUDE"]).unwrap();
        lat.put_values(&[63.7], ..).unwrap();
        let mut lon = file.add_variable::<f64>("LONGITUDE", &["LONGITUDE"]).unwrap();
        lon.put_values(&[8.5], ..).unwrap();

        let mut u = file.add_variable::<f64>("UVEL", &["TIME"]).unwrap();
        u.put_attribute("_FillValue", -999.0).unwrap();
        u.put_values(&[0.1, -999.0, 0.3, 0.4], ..).unwrap();

        let mut v = file.add_variable::<f64>("VVEL", &["TIME"]).unwrap();
        v.put_attribute("scale_factor", 0.01).unwrap();
        v.put_values(&[10.0, 20.0, 30.0, FILL_VALUE_F64], ..).unwrap();
    }

    #[test]
    fn test_read_velocity_netcdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vel.nc");
        write_velocity_file(&path);

        let vel = read_velocity_netcdf(&path).unwrap();

        assert_eq!(vel.station, "M1");
        assert_eq!(vel.position, Some((8.5, 63.7)));
        assert_eq!(vel.time, vec![0.0, 3600.0, 7200.0, 10_800.0]);
        assert!((vel.u[0] - 0.1).abs() < 1e-12);
        assert!(vel.u[1].is_nan());
        assert!((vel.v[2] - 0.3).abs() < 1e-12);
        assert!(vel.v[3].is_nan());
    }

    #[test]
    fn test_time_must_lead() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("depth_first.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("TIME", 3).unwrap();
            file.add_dimension("DEPTH", 2).unwrap();

            let mut time = file.add_variable::<f64>("TIME", &["TIME"]).unwrap();
            time.put_attribute("units", "hours since 2019-05-01 00:00:00")
                .unwrap();
            time.put_values(&[0.0, 1.0, 2.0], ..).unwrap();

            // Row-major [DEPTH, TIME]: the stride walk would mix depths
            for name in ["UVEL", "VVEL"] {
                let mut var = file.add_variable::<f64>(name, &["DEPTH", "TIME"]).unwrap();
                var.put_values(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], ..).unwrap();
            }
        }

        let err = read_velocity_netcdf(&path).unwrap_err();
        assert!(
            matches!(err, NetCDFError::InvalidData(ref msg) if msg.contains("UVEL")),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_time_with_trailing_depth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("time_first.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("TIME", 3).unwrap();
            file.add_dimension("DEPTH", 2).unwrap();

            let mut time = file.add_variable::<f64>("TIME", &["TIME"]).unwrap();
            time.put_values(&[0.0, 60.0, 120.0], ..).unwrap();

            for name in ["UVEL", "VVEL"] {
                let mut var = file.add_variable::<f64>(name, &["TIME", "DEPTH"]).unwrap();
                var.put_values(&[0.1, 9.0, 0.2, 9.0, 0.3, 9.0], ..).unwrap();
            }
        }

        let vel = read_velocity_netcdf(&path).unwrap();
        assert_eq!(vel.u, vec![0.1, 0.2, 0.3]);
        assert_eq!(vel.time, vec![0.0, 60.0, 120.0]);
    }

    #[test]
    fn test_missing_variable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vel.nc");
        write_velocity_file(&path);

        let err = read_ctd_netcdf(&path).unwrap_err();
        assert!(matches!(err, NetCDFError::MissingVariable(ref v) if v == "PSAL"));
    }
}
