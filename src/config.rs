//! TOML configuration file
//!
//! Every setting is optional; command-line flags override the file.
//!
//! ```toml
//! [console]
//! serial = "dev=/dev/ttyUSB0:115200"
//!
//! [transport]
//! kind = "udp"
//! bind = "0.0.0.0:1884"
//! broadcast_port = 1884
//!
//! [loopback]
//! own_address = [10, 0, 0, 1]
//! broadcast_address = [255, 255, 255, 255]
//! max_payload = 64
//!
//! [bridge]
//! max_restarts = 10
//! restart_delay_ms = 500
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// Parsed config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Host-side serial console
    pub console: ConsoleSection,
    /// Transport selection
    pub transport: TransportSection,
    /// Loopback transport parameters
    pub loopback: LoopbackSection,
    /// Run loop behaviour
    pub bridge: BridgeSection,
}

/// `[console]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleSection {
    /// `stdio` or `dev=<path>[:baud]`
    pub serial: Option<String>,
}

/// `[transport]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    /// Transport name (`loopback`, `udp`)
    pub kind: Option<String>,
    /// Local UDP socket address
    pub bind: Option<String>,
    /// UDP broadcast destination port
    pub broadcast_port: Option<u16>,
}

/// `[loopback]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopbackSection {
    /// Own address bytes; also fixes the address width
    pub own_address: Option<Vec<u8>>,
    /// Broadcast address bytes
    pub broadcast_address: Option<Vec<u8>>,
    /// Largest payload accepted by the emulated radio
    pub max_payload: Option<usize>,
}

/// `[bridge]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSection {
    /// Stop after this many restarts (unlimited if unset)
    pub max_restarts: Option<u32>,
    /// Pause before restarting, in milliseconds (100 if unset)
    pub restart_delay_ms: Option<u64>,
}

impl Config {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config from a TOML string
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }
}
