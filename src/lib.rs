//! Handheld IMU data logger.
//!
//! The pure logic (debouncing, the sampling/mount lifecycle, menu
//! composition, CSV formatting, serial commands) builds for any target
//! and is tested on the host:
//!
//! Usage: `cargo test --lib` or `cargo test`
//!
//! The SD card session in [`storage`] sits on `embedded-sdmmc` and is tested
//! against an in-memory block device. The remaining hardware drivers behind
//! the collaborator traits in [`peripherals`] are only compiled with the
//! `embedded` feature, which the firmware binary (`src/main.rs`) requires.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod csv;
pub mod error;
pub mod lifecycle;
pub mod peripherals;
pub mod ui;

#[cfg(feature = "embedded")]
pub mod indicator;
#[cfg(feature = "embedded")]
pub mod sensor;
pub mod storage;

pub use error::Error;
pub use lifecycle::{Lifecycle, MountState, SamplingState, StatusSnapshot, TickReport};
pub use peripherals::{Devices, LedColor, SensorSample};
pub use ui::{Button, ButtonEvent, MenuPage};
