//! Collaborator interfaces the lifecycle drives.
//!
//! The state machine never talks to hardware directly. The embedded build
//! implements these traits on top of embassy-rp drivers; host tests use
//! in-memory mocks.

use crate::Error;

/// One scaled IMU sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSample {
    /// Acceleration in g.
    pub accel: [f32; 3],
    /// Angular rate in degrees per second.
    pub gyro: [f32; 3],
}

impl SensorSample {
    /// Accelerometer sensitivity at the ±2 g range (LSB per g).
    pub const ACCEL_LSB_PER_G: f32 = 16384.0;
    /// Gyroscope sensitivity at the ±250 °/s range (LSB per °/s).
    pub const GYRO_LSB_PER_DPS: f32 = 131.0;

    /// Scale raw MPU6050 register values to physical units.
    pub fn from_raw(accel: [i16; 3], gyro: [i16; 3]) -> Self {
        Self {
            accel: accel.map(|v| v as f32 / Self::ACCEL_LSB_PER_G),
            gyro: gyro.map(|v| v as f32 / Self::GYRO_LSB_PER_DPS),
        }
    }
}

/// Colors of the RGB status LED.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedColor {
    Off,
    Red,
    Green,
    Blue,
}

/// Removable storage holding the CSV log.
///
/// Every call is synchronous: the loop blocks until the driver returns.
pub trait StorageSession {
    fn mount(&mut self) -> Result<(), Error>;
    fn unmount(&mut self) -> Result<(), Error>;
    /// Create the file, truncating any previous content.
    fn open_write(&mut self, name: &str) -> Result<(), Error>;
    fn append(&mut self, bytes: &[u8]) -> Result<(), Error>;
    fn close(&mut self) -> Result<(), Error>;
    /// Stream the whole file into `sink`, returning the number of bytes read.
    fn read_file(&mut self, name: &str, sink: &mut dyn FnMut(&[u8])) -> Result<usize, Error>;
}

/// Source of IMU samples.
pub trait SensorReader {
    fn read(&mut self) -> Result<SensorSample, Error>;
}

/// Text-only view of the monochrome display.
pub trait DisplayRenderer {
    fn clear(&mut self);
    fn draw_line(&mut self, text: &str, x: i32, y: i32);
    fn flush(&mut self) -> Result<(), Error>;
}

/// RGB LED and buzzer.
pub trait Indicator {
    fn set_color(&mut self, color: LedColor);
    fn tone(&mut self, freq_hz: u32, duration_ms: u32);
}

/// Bundle of collaborators handed to [`crate::lifecycle::Lifecycle::tick`].
pub struct Devices<S, R, D, I> {
    pub storage: S,
    pub sensor: R,
    pub display: D,
    pub indicator: I,
}
