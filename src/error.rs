//! Error types for the uartbridge binary

use std::path::PathBuf;

use thiserror::Error;

/// Application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        /// Path of the config file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Transport name not known or not compiled in
    #[error("Unknown transport: {0}")]
    UnknownTransport(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Console I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge could not write to the console
    #[error("Bridge error: {0}")]
    Bridge(#[from] uartbridge_core::Error),

    /// Restart limit reached
    #[error("Giving up after {0} restarts")]
    TooManyRestarts(u32),
}
