//! Serial console commands.
//!
//! Bytes arrive one at a time from the UART. [`LineBuffer`] assembles them
//! into lines (CR or LF terminated, backspace erases) and [`Command::parse`]
//! maps a line to an action for the main loop.

use core::fmt::{self, Write};

use heapless::Vec;

use crate::lifecycle::StatusSnapshot;

/// Actions requested over the serial console.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// `d` - print the CSV log file.
    Dump,
    /// `s` - print mount/sampling state and counters.
    Status,
    /// Anything else that was not empty.
    Unknown,
}

impl Command {
    /// Parse one trimmed, case-insensitive command line. Empty lines yield `None`.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let line = line.trim_ascii();
        match line {
            [] => None,
            [b'd' | b'D'] => Some(Command::Dump),
            [b's' | b'S'] => Some(Command::Status),
            _ => Some(Command::Unknown),
        }
    }
}

/// Fixed-capacity line assembler.
pub struct LineBuffer<const N: usize> {
    buf: Vec<u8, N>,
    /// Set when the current line outgrew the buffer; it is discarded at
    /// the terminator.
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; returns a command when a line is completed.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        match byte {
            b'\r' | b'\n' => {
                let command = if self.overflowed {
                    warn!("command line longer than {} bytes discarded", N);
                    None
                } else {
                    Command::parse(&self.buf)
                };
                self.buf.clear();
                self.overflowed = false;
                command
            }
            // Backspace / DEL
            0x08 | 0x7f => {
                self.buf.pop();
                None
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line status summary printed by the `s` command.
pub fn write_status<W: Write>(out: &mut W, status: &StatusSnapshot) -> fmt::Result {
    writeln!(
        out,
        "mount={:?} sampling={:?} page={:?} samples={} lines={} failed_writes={} failed_reads={}\r",
        status.mount,
        status.sampling,
        status.page,
        status.samples,
        status.lines,
        status.failed_writes,
        status.failed_reads,
    )
}
