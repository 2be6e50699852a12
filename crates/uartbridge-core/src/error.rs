//! Error types for uartbridge-core
//!
//! This module provides a no_std compatible error type shared by the bridge
//! and by transport implementations.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport errors
    /// Transport failed to initialize
    TransportInitFailed,
    /// Transport poll reported a fault (link lost, driver error)
    TransportDisconnected,
    /// Transport refused or failed to send a message
    SendFailed,
    /// Transport could not answer a configuration query
    QueryFailed,
    /// Payload is larger than the transport accepts
    PayloadTooLarge,
    /// Address width does not match the transport
    AddressWidthMismatch,

    // Bridge errors
    /// Writing a line to the serial output failed
    SinkWriteFailed,
    /// Formatted output line does not fit the output buffer
    LineTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportInitFailed => write!(f, "transport initialization failed"),
            Self::TransportDisconnected => write!(f, "transport disconnected"),
            Self::SendFailed => write!(f, "transport send failed"),
            Self::QueryFailed => write!(f, "transport query failed"),
            Self::PayloadTooLarge => write!(f, "payload too large for transport"),
            Self::AddressWidthMismatch => write!(f, "address width mismatch"),
            Self::SinkWriteFailed => write!(f, "serial output write failed"),
            Self::LineTooLong => write!(f, "output line too long"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
