//! Mooring record text file reader and writer.
//!
//! # File Formats
//!
//! ## Simple Text Format
//!
//! ```text
//! # CTD record
//! # station: M1
//! # longitude: 8.5
//! # latitude: 63.7
//! # time_units: seconds since 2019-05-01 00:00:00
//! time PSAL TEMP PRES
//! 0.0 34.52 7.81 41.2
//! 600.0 34.55 7.79 41.3
//! ```
//!
//! Velocity files use the columns `time UVEL VVEL`. The header line is
//! optional; without it columns are taken in the order above. With it,
//! columns are matched by name (case-insensitive, unit suffixes such as
//! `time(s)` ignored) and may appear in any order.
//!
//! ## CSV Format
//!
//! ```text
//! time,UVEL,VVEL
//! 0.0,0.15,0.08
//! 600.0,0.22,0.12
//! ```
//!
//! Missing samples may be written as `NaN`; they are kept and removed later
//! by quality control.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::{CtdRecord, VelocityRecord};
use crate::analysis::{CfTimeUnits, TimeError};

const CTD_COLUMNS: [&str; 4] = ["time", "PSAL", "TEMP", "PRES"];
const VELOCITY_COLUMNS: [&str; 3] = ["time", "UVEL", "VVEL"];

/// Error type for record file operations.
#[derive(Debug, Error)]
pub enum RecordFileError {
    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Parse error in file content
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Header does not name a required column
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// `time_units` metadata could not be interpreted
    #[error("Time units: {0}")]
    TimeUnits(#[from] TimeError),
}

/// Numeric columns plus `# key: value` metadata.
struct Table {
    metadata: HashMap<String, String>,
    columns: Vec<Vec<f64>>,
}

/// Parse a CTD record from any buffered reader.
pub fn parse_ctd<R: BufRead>(reader: R) -> Result<CtdRecord, RecordFileError> {
    let table = parse_table(reader, &CTD_COLUMNS)?;
    let (units, station, position) = header_info(&table.metadata)?;

    let [time, psal, temp, pres]: [Vec<f64>; 4] = table
        .columns
        .try_into()
        .map_err(|_| RecordFileError::InvalidFormat("unexpected column count".to_string()))?;
    let time = time.iter().map(|&t| units.to_seconds(t)).collect();

    let mut record = CtdRecord::new(station, time, psal, temp, pres).with_epoch(units.epoch);
    record.position = position;
    record.metadata = table.metadata;
    Ok(record)
}

/// Parse a velocity record from any buffered reader.
pub fn parse_velocity<R: BufRead>(reader: R) -> Result<VelocityRecord, RecordFileError> {
    let table = parse_table(reader, &VELOCITY_COLUMNS)?;
    let (units, station, position) = header_info(&table.metadata)?;

    let [time, u, v]: [Vec<f64>; 3] = table
        .columns
        .try_into()
        .map_err(|_| RecordFileError::InvalidFormat("unexpected column count".to_string()))?;
    let time = time.iter().map(|&t| units.to_seconds(t)).collect();

    let mut record = VelocityRecord::new(station, time, u, v).with_epoch(units.epoch);
    record.position = position;
    record.metadata = table.metadata;
    Ok(record)
}

/// Read a CTD record file.
pub fn read_ctd_file(path: &Path) -> Result<CtdRecord, RecordFileError> {
    let file = File::open(path)?;
    parse_ctd(BufReader::new(file))
}

/// Read a velocity record file.
pub fn read_velocity_file(path: &Path) -> Result<VelocityRecord, RecordFileError> {
    let file = File::open(path)?;
    parse_velocity(BufReader::new(file))
}

/// Write a CTD record in simple text format.
pub fn write_ctd_file(path: &Path, record: &CtdRecord) -> Result<(), RecordFileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# CTD record")?;
    write_header(
        &mut writer,
        &record.station,
        record.position,
        &record.time_units(),
    )?;
    writeln!(writer, "{}", CTD_COLUMNS.join(" "))?;

    for i in 0..record.len() {
        writeln!(
            writer,
            "{} {} {} {}",
            record.time[i],
            record.practical_salinity[i],
            record.temperature[i],
            record.pressure[i]
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a velocity record in simple text format.
pub fn write_velocity_file(path: &Path, record: &VelocityRecord) -> Result<(), RecordFileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Current meter record")?;
    write_header(
        &mut writer,
        &record.station,
        record.position,
        &record.time_units(),
    )?;
    writeln!(writer, "# units: m/s")?;
    writeln!(writer, "{}", VELOCITY_COLUMNS.join(" "))?;

    for i in 0..record.len() {
        writeln!(writer, "{} {} {}", record.time[i], record.u[i], record.v[i])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_header<W: Write>(
    writer: &mut W,
    station: &str,
    position: Option<(f64, f64)>,
    units: &CfTimeUnits,
) -> std::io::Result<()> {
    writeln!(writer, "# station: {}", station)?;
    if let Some((longitude, latitude)) = position {
        writeln!(writer, "# longitude: {}", longitude)?;
        writeln!(writer, "# latitude: {}", latitude)?;
    }
    writeln!(writer, "# time_units: {}", units)
}

/// Time units, station name and position from the metadata block.
fn header_info(
    metadata: &HashMap<String, String>,
) -> Result<(CfTimeUnits, String, Option<(f64, f64)>), RecordFileError> {
    let units = match metadata.get("time_units").or_else(|| metadata.get("units")) {
        Some(s) if s.contains(" since ") => CfTimeUnits::parse(s)?,
        _ => CfTimeUnits::unix_seconds(),
    };

    let station = metadata
        .get("station")
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());

    let coordinate = |keys: &[&str]| -> Result<Option<f64>, RecordFileError> {
        match keys.iter().find_map(|k| metadata.get(*k)) {
            Some(s) => s.parse().map(Some).map_err(|_| {
                RecordFileError::ParseError(format!("Invalid {} in metadata: {}", keys[0], s))
            }),
            None => Ok(None),
        }
    };
    let longitude = coordinate(&["longitude", "lon"])?;
    let latitude = coordinate(&["latitude", "lat"])?;

    Ok((units, station, longitude.zip(latitude)))
}

fn split_fields(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(|s| s.trim()).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Column name without unit suffix, e.g. `time(s)` -> `time`.
fn column_key(field: &str) -> String {
    field
        .split(['(', '['])
        .next()
        .unwrap_or(field)
        .trim()
        .to_ascii_lowercase()
}

fn parse_table<R: BufRead>(reader: R, names: &[&str]) -> Result<Table, RecordFileError> {
    let mut metadata: HashMap<String, String> = HashMap::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    // Source field index for each requested column
    let mut indices: Vec<usize> = (0..names.len()).collect();
    let mut seen_data = false;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        // Parse comments/metadata
        if let Some(content) = line.strip_prefix('#') {
            if let Some((key, value)) = content.trim().split_once(':') {
                metadata.insert(key.trim().to_lowercase(), value.trim().to_string());
            }
            continue;
        }

        let parts = split_fields(line);

        // Header line: first field is not a number
        if !seen_data && parts.first().is_some_and(|f| f.parse::<f64>().is_err()) {
            let keys: Vec<String> = parts.iter().map(|f| column_key(f)).collect();
            for (slot, name) in indices.iter_mut().zip(names) {
                *slot = keys
                    .iter()
                    .position(|k| k.eq_ignore_ascii_case(name))
                    .ok_or_else(|| RecordFileError::MissingColumn(name.to_string()))?;
            }
            continue;
        }
        seen_data = true;

        for ((column, &index), name) in columns.iter_mut().zip(&indices).zip(names) {
            let field = parts.get(index).ok_or_else(|| {
                RecordFileError::ParseError(format!(
                    "Line {} needs at least {} columns: {}",
                    line_num + 1,
                    index + 1,
                    line
                ))
            })?;
            let value: f64 = field.parse().map_err(|_| {
                RecordFileError::ParseError(format!(
                    "Invalid {} at line {}: {}",
                    name,
                    line_num + 1,
                    field
                ))
            })?;
            column.push(value);
        }
    }

    if !seen_data {
        return Err(RecordFileError::InvalidFormat(
            "No data records found in file".to_string(),
        ));
    }

    Ok(Table { metadata, columns })
}
