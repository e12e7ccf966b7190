//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and file-format
//! constants live here so they can be tuned in one place. Policy knobs
//! that tests want to vary are collected in [`LoggerConfig`].

// GPIO pin assignments (BitDogLab RP2040 board)
//
// These are logical names; the actual `embassy_rp::peripherals::*` pins are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button A (page)        → GPIO5
//   Button B (mount)       → GPIO6
//   Joystick push (start)  → GPIO22
//   MPU6050 I²C0 SDA/SCL   → GPIO0 / GPIO1
//   SSD1306 I²C1 SDA/SCL   → GPIO14 / GPIO15
//   SD card SPI0 SCK/MOSI  → GPIO18 / GPIO19
//   SD card SPI0 MISO/CS   → GPIO16 / GPIO17
//   RGB LED R/G/B          → GPIO13 / GPIO11 / GPIO12
//   Buzzer (PWM2 B)        → GPIO21
//   UART1 TX/RX            → GPIO8 / GPIO9

// Input

/// Button debounce window (ms). An edge is accepted only when strictly
/// more than this has elapsed since the last accepted edge of that button.
pub const BUTTON_DEBOUNCE_MS: u64 = 260;

/// Depth of the button event channel between edge handlers and the loop.
pub const EVENT_QUEUE_DEPTH: usize = 4;

// Main loop

/// Poll cadence of the cooperative main loop (ms).
pub const POLL_INTERVAL_MS: u64 = 200;

/// Heartbeat blink period of the blue LED while sampling (ms).
pub const BLINK_PERIOD_MS: u64 = 600;

/// How long an action message stays on screen (ms).
pub const MESSAGE_DURATION_MS: u64 = 2000;

/// How long the boot splash stays on screen (ms).
pub const SPLASH_DURATION_MS: u64 = 2500;

/// Maximum number of action messages waiting to be shown.
pub const MESSAGE_QUEUE_DEPTH: usize = 4;

// Storage

/// Name of the CSV file written on the SD card (8.3 format).
pub const LOG_FILE_NAME: &str = "adc_data.csv";

/// Chunk size used when streaming the log file back over serial.
pub const DUMP_CHUNK_SIZE: usize = 64;

// Feedback

/// Two-tone confirmation played after a sampling session is closed:
/// `(frequency Hz, duration ms)`.
pub const STOP_TONES: [(u32, u32); 2] = [(1000, 120), (1500, 120)];

// Serial console

/// Longest accepted command line, in bytes.
pub const COMMAND_LINE_LEN: usize = 32;

/// UART baud rate for the serial console.
pub const UART_BAUD_RATE: u32 = 115_200;

/// What goes in the first CSV column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyColumn {
    /// Milliseconds elapsed since the session started (`time_ms`).
    ElapsedMs,
    /// 1-based sequential sample number (`numero_amostra`).
    SampleIndex,
}

/// When the active menu page is redrawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderPolicy {
    /// Only when something shown on the page changed.
    OnChange,
    /// Every tick. Costs display bandwidth, never misses an update.
    Always,
}

/// Runtime policy for the lifecycle state machine.
#[derive(Clone, Copy, Debug)]
pub struct LoggerConfig {
    pub key_column: KeyColumn,
    pub render_policy: RenderPolicy,
    pub blink_period_ms: u64,
    pub message_duration_ms: u64,
    pub file_name: &'static str,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            key_column: KeyColumn::ElapsedMs,
            render_policy: RenderPolicy::OnChange,
            blink_period_ms: BLINK_PERIOD_MS,
            message_duration_ms: MESSAGE_DURATION_MS,
            file_name: LOG_FILE_NAME,
        }
    }
}
