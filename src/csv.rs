//! CSV layout of the log file.
//!
//! One header line, then one row per sample: the key column followed by
//! the six axes with two decimal places.

use core::fmt::Write;

use heapless::String;

use crate::config::KeyColumn;
use crate::peripherals::SensorSample;
use crate::Error;

/// Longest row we ever produce: a 20-digit key plus six signed axes.
pub const ROW_CAPACITY: usize = 96;

pub type Row = String<ROW_CAPACITY>;

pub const HEADER_ELAPSED: &str = "time_ms,accel_x,accel_y,accel_z,giro_x,giro_y,giro_z\n";
pub const HEADER_INDEX: &str = "numero_amostra,accel_x,accel_y,accel_z,giro_x,giro_y,giro_z\n";

/// Header line for the chosen key column.
pub fn header(key: KeyColumn) -> &'static str {
    match key {
        KeyColumn::ElapsedMs => HEADER_ELAPSED,
        KeyColumn::SampleIndex => HEADER_INDEX,
    }
}

/// Format one data row, newline terminated.
pub fn format_row(key: u64, sample: &SensorSample) -> Result<Row, Error> {
    let mut row = Row::new();
    let [ax, ay, az] = sample.accel;
    let [gx, gy, gz] = sample.gyro;
    writeln!(
        row,
        "{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
        key, ax, ay, az, gx, gy, gz
    )
    .map_err(|_| Error::BufferOverflow)?;
    Ok(row)
}
