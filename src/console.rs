//! Host console: where protocol bytes come from and lines go to
//!
//! The console is split into an input half ([`ByteSource`]) and an output
//! half ([`WriteSink`]) so the bridge can own the output while the run loop
//! keeps reading input.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use uartbridge_core::{Error as CoreError, LineSink};

use crate::error::AppError;

/// Default serial baud rate
pub const DEFAULT_BAUD: u32 = 115200;

/// Console selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleSpec {
    /// Standard input and output
    Stdio,
    /// Serial port
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for [`DEFAULT_BAUD`])
        baud: Option<u32>,
    },
}

impl ConsoleSpec {
    /// Parse a console string
    ///
    /// Formats:
    /// - `stdio` - standard input/output
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:115200` - Serial with specified baud
    pub fn parse(s: &str) -> Result<Self, String> {
        if s == "stdio" {
            return Ok(ConsoleSpec::Stdio);
        }
        let Some(dev) = s.strip_prefix("dev=") else {
            return Err(format!(
                "Invalid console: {}. Use stdio or dev=<port>[:baud]",
                s
            ));
        };
        if let Some((device, baud_str)) = dev.rsplit_once(':') {
            let baud = baud_str
                .parse()
                .map_err(|_| format!("Invalid baud rate: {}", baud_str))?;
            Ok(ConsoleSpec::Serial {
                device: device.to_string(),
                baud: Some(baud),
            })
        } else {
            Ok(ConsoleSpec::Serial {
                device: dev.to_string(),
                baud: None,
            })
        }
    }
}

/// Input half of a console
pub trait ByteSource {
    /// Append whatever bytes are available without waiting long
    ///
    /// Returns `false` once the input is closed for good.
    fn read_into(&mut self, pending: &mut VecDeque<u8>) -> Result<bool, AppError>;
}

/// [`LineSink`] over a `std::io::Write`
pub struct WriteSink<W: Write> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> LineSink for WriteSink<W> {
    fn write_line(&mut self, line: &str) -> uartbridge_core::Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|()| self.writer.flush())
            .map_err(|e| {
                log::error!("console write failed: {}", e);
                CoreError::SinkWriteFailed
            })
    }
}

/// Opened console
pub type Console = (Box<dyn ByteSource>, WriteSink<Box<dyn Write + Send>>);

/// Open the selected console
pub fn open_console(selection: &ConsoleSpec) -> Result<Console, AppError> {
    match selection {
        ConsoleSpec::Stdio => {
            log::info!("Console on stdin/stdout");
            Ok((
                Box::new(StdinSource::spawn()),
                WriteSink::new(Box::new(io::stdout())),
            ))
        }
        ConsoleSpec::Serial { device, baud } => {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);
            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_millis(1))
                .open()?;
            let writer = port.try_clone()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok((
                Box::new(SerialSource { port }),
                WriteSink::new(Box::new(writer)),
            ))
        }
    }
}

/// Serial port input
struct SerialSource {
    port: Box<dyn serialport::SerialPort>,
}

impl ByteSource for SerialSource {
    fn read_into(&mut self, pending: &mut VecDeque<u8>) -> Result<bool, AppError> {
        let mut buf = [0u8; 256];
        match self.port.read(&mut buf) {
            Ok(n) => {
                pending.extend(&buf[..n]);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stdin input, read on a helper thread since stdin cannot be polled
struct StdinSource {
    rx: Receiver<Vec<u8>>,
}

impl StdinSource {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::error!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
            log::debug!("stdin closed");
        });
        Self { rx }
    }
}

impl ByteSource for StdinSource {
    fn read_into(&mut self, pending: &mut VecDeque<u8>) -> Result<bool, AppError> {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => pending.extend(chunk),
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }
}
