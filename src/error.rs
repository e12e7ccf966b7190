//! Unified error type for the data logger.
//!
//! We avoid `alloc` - all error variants carry no data, so the enum is
//! `Copy` and cheap to pass out of collaborator calls.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Storage
    /// The SD card volume could not be mounted.
    MountFailed,

    /// The SD card volume could not be released.
    UnmountFailed,

    /// An operation needs a mounted volume but none is mounted.
    NotMounted,

    /// The log file could not be created or truncated.
    FileOpen,

    /// Appending to the log file failed.
    Write,

    /// Closing the log file failed.
    Close,

    /// Reading the log file back failed.
    Read,

    // Sensors
    /// The IMU did not answer or returned a short read.
    SensorRead,

    // UI / Display
    /// I²C transaction to the display failed.
    Display,

    // Generic
    /// The operation is not allowed while a sampling session is active.
    Busy,

    /// Buffer too small for the requested operation.
    BufferOverflow,
}

impl Error {
    /// Short tag shown on the serial console.
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::MountFailed => "mount failed",
            Error::UnmountFailed => "unmount failed",
            Error::NotMounted => "sd card not mounted",
            Error::FileOpen => "file open failed",
            Error::Write => "write failed",
            Error::Close => "close failed",
            Error::Read => "read failed",
            Error::SensorRead => "sensor read failed",
            Error::Display => "display error",
            Error::Busy => "sampling in progress",
            Error::BufferOverflow => "buffer overflow",
        }
    }
}
