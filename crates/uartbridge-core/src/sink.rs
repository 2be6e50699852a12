//! Serial output sink

use crate::error::{Error, Result};

/// Line-oriented output towards the host
pub trait LineSink {
    /// Write one line; the implementation appends the `\n` terminator
    fn write_line(&mut self, line: &str) -> Result<()>;
}

impl<S: LineSink + ?Sized> LineSink for &mut S {
    fn write_line(&mut self, line: &str) -> Result<()> {
        (**self).write_line(line)
    }
}

/// [`LineSink`] over any [`embedded_io::Write`] (UART TX, `Vec<u8>`, ...)
#[derive(Debug, Default)]
pub struct IoSink<W> {
    writer: W,
}

impl<W: embedded_io::Write> IoSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get a reference to the writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get a mutable reference to the writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> LineSink for IoSink<W> {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush())
            .map_err(|_| Error::SinkWriteFailed)
    }
}
