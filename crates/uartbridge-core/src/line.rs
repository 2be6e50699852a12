//! Serial line accumulator
//!
//! Bytes from the serial input are collected one at a time until the line
//! terminator arrives. There is no queue: exactly one line can be pending,
//! and it must be released with [`LineBuffer::reset`] before the next byte
//! is accepted.
//!
//! After an overflow the rest of the over-long line is dropped up to and
//! including its terminator, so its tail is never read as a command.

use heapless::Vec;

/// Capacity of the serial line buffer in bytes, terminator included
pub const SERIAL_BUFFER_SIZE: usize = 300;

/// Byte that completes a line
pub const LINE_TERMINATOR: u8 = b'\n';

/// Bounded line buffer with a ready flag
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buf: Vec<u8, SERIAL_BUFFER_SIZE>,
    ready: bool,
    overflowed: bool,
    discarding: bool,
}

impl LineBuffer {
    /// Create an empty line buffer
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            ready: false,
            overflowed: false,
            discarding: false,
        }
    }

    /// Append one byte
    ///
    /// The terminator is stored like any other byte and marks the line ready.
    /// Filling the buffer without a terminator flags an overflow, which the
    /// bridge turns into a parse failure on its next tick.
    ///
    /// Returns `false` if the byte was refused because a line (or an
    /// overflow) is still waiting to be consumed.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.is_pending() {
            return false;
        }
        if self.discarding {
            if byte == LINE_TERMINATOR {
                log::debug!("end of overflowed line");
                self.discarding = false;
            }
            return true;
        }
        if self.buf.push(byte).is_err() {
            self.overflowed = true;
            return false;
        }
        if byte == LINE_TERMINATOR {
            self.ready = true;
        } else if self.buf.is_full() {
            log::debug!(
                "line buffer overflow: {} bytes without terminator",
                SERIAL_BUFFER_SIZE
            );
            self.overflowed = true;
        }
        true
    }

    /// A complete line is available
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The buffer filled up before a terminator was seen
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Either a line or an overflow is waiting for the state machine
    pub fn is_pending(&self) -> bool {
        self.ready || self.overflowed
    }

    /// Content of the ready line without its terminator
    ///
    /// A single carriage return before the terminator is stripped as well so
    /// terminals sending `\r\n` work unchanged.
    pub fn line(&self) -> Option<&[u8]> {
        if !self.ready {
            return None;
        }
        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(&[LINE_TERMINATOR]) {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        Some(line)
    }

    /// Number of bytes currently stored
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// No bytes stored
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes are being dropped until the end of an overflowed line
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Clear content, counter and flags
    ///
    /// Releasing an overflow starts discarding the rest of that line.
    pub fn reset(&mut self) {
        self.discarding = self.overflowed;
        self.buf.clear();
        self.ready = false;
        self.overflowed = false;
    }
}
