//! I/O utilities for reading and writing mooring records.
//!
//! This module provides:
//! - **Records**: [`CtdRecord`] and [`VelocityRecord`], raw data as stored on disk
//! - **Text files**: Simple whitespace/CSV format with `#` metadata comments
//! - **NetCDF input**: CF-conventions mooring files (requires `netcdf` feature)
//!
//! # File Formats
//!
//! ## CTD Files
//!
//! ```text
//! # station: M1
//! # longitude: 8.5
//! # latitude: 63.7
//! # time_units: seconds since 2019-05-01 00:00:00
//! time PSAL TEMP PRES
//! 0.0 34.52 7.81 41.2
//! 600.0 34.55 7.79 41.3
//! ```
//!
//! ## Velocity Files
//!
//! ```text
//! # station: M1
//! # time_units: seconds since 2019-05-01 00:00:00
//! time UVEL VVEL
//! 0.0 0.15 0.08
//! 600.0 0.22 0.12
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use mooring_rs::io::{read_ctd_file, read_velocity_file};
//!
//! let ctd = read_ctd_file(Path::new("m1_ctd.txt"))?;
//! let vel = read_velocity_file(Path::new("m1_vel.txt"))?;
//! println!("{}: {} CTD samples, {} velocity samples", ctd.station, ctd.len(), vel.len());
//! ```

#[cfg(feature = "netcdf")]
mod netcdf_io;
mod record_reader;
mod records;

#[cfg(feature = "netcdf")]
pub use netcdf_io::{
    FILL_VALUE_F64, NetCDFError, is_valid_f64, read_ctd_netcdf, read_velocity_netcdf,
};
pub use record_reader::{
    RecordFileError, parse_ctd, parse_velocity, read_ctd_file, read_velocity_file,
    write_ctd_file, write_velocity_file,
};
pub use records::{CtdRecord, VelocityRecord};
