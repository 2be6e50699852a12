//! Transport registration and dispatch
//!
//! Transports are feature-gated; this registry only lists what was compiled in.

#[cfg(feature = "udp")]
use std::net::SocketAddrV4;

use uartbridge_core::Transport;

use crate::config::LoopbackSection;
use crate::error::AppError;

/// Default transport when none is given
pub const DEFAULT_TRANSPORT: &str = "loopback";

/// Default UDP bind address
#[cfg(feature = "udp")]
pub const DEFAULT_UDP_BIND: &str = "0.0.0.0:1884";

/// Information about a transport
pub struct TransportInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all transports enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "loopback")]
    transports.push(TransportInfo {
        name: "loopback",
        aliases: &["dummy"],
        description: "In-memory radio that echoes own and broadcast traffic",
    });

    #[cfg(feature = "udp")]
    transports.push(TransportInfo {
        name: "udp",
        aliases: &[],
        description: "UDP datagrams, 6-byte addresses (IPv4 + port) (--bind, --broadcast-port)",
    });

    transports
}

/// Short comma-separated list of transport names for CLI help
pub fn transport_names_short() -> String {
    let transports = available_transports();
    let names: Vec<&str> = transports.iter().map(|t| t.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the primary transport name
pub fn find_transport(name: &str) -> Option<&'static str> {
    available_transports()
        .into_iter()
        .find(|t| t.name == name || t.aliases.contains(&name))
        .map(|t| t.name)
}

/// Transport selection after merging CLI and config file
#[derive(Debug, Clone, Default)]
pub struct TransportSettings {
    /// Transport name or alias
    pub kind: String,
    /// UDP bind address
    pub bind: Option<String>,
    /// UDP broadcast port
    pub broadcast_port: Option<u16>,
    /// Loopback parameters
    pub loopback: LoopbackSection,
}

/// Open the transport described by `settings`
///
/// The transport is not initialized here; `Bridge::begin` does that.
pub fn open_transport(settings: &TransportSettings) -> Result<Box<dyn Transport + Send>, AppError> {
    let name = find_transport(&settings.kind)
        .ok_or_else(|| AppError::UnknownTransport(settings.kind.clone()))?;

    log::debug!("Selected transport {}", name);

    match name {
        #[cfg(feature = "loopback")]
        "loopback" => {
            let config = loopback_config(&settings.loopback)?;
            log::info!(
                "Loopback transport, {}-byte addresses, max payload {}",
                config.address_width,
                config.max_payload
            );
            Ok(Box::new(uartbridge_loopback::LoopbackTransport::new(config)))
        }
        #[cfg(feature = "udp")]
        "udp" => {
            let bind_str = settings.bind.as_deref().unwrap_or(DEFAULT_UDP_BIND);
            let bind: SocketAddrV4 = bind_str
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid UDP bind address: {}", bind_str)))?;
            let broadcast_port = settings.broadcast_port.unwrap_or(bind.port());
            log::info!("UDP transport on {}, broadcast port {}", bind, broadcast_port);
            Ok(Box::new(uartbridge_udp::UdpTransport::new(bind, broadcast_port)))
        }
        _ => Err(AppError::UnknownTransport(settings.kind.clone())),
    }
}

/// Build a loopback config; the own address fixes the address width
#[cfg(feature = "loopback")]
fn loopback_config(
    section: &LoopbackSection,
) -> Result<uartbridge_loopback::LoopbackConfig, AppError> {
    use uartbridge_core::{Address, MAX_ADDRESS_LEN, PAYLOAD_CAPACITY};

    let mut config = uartbridge_loopback::LoopbackConfig::default();

    let to_address = |bytes: &[u8], what: &str| {
        Address::from_slice(bytes)
            .filter(|address| address.width() > 0)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "loopback {} must be 1 to {} bytes, got {}",
                    what,
                    MAX_ADDRESS_LEN,
                    bytes.len()
                ))
            })
    };

    if let Some(own) = &section.own_address {
        let address = to_address(own, "own_address")?;
        config.address_width = address.width();
        if section.broadcast_address.is_none() {
            config.broadcast_address = Address::from_slice(&vec![0xff; address.width()]);
        }
        config.own_address = Some(address);
    }

    if let Some(broadcast) = &section.broadcast_address {
        let address = to_address(broadcast, "broadcast_address")?;
        if address.width() != config.address_width {
            return Err(AppError::Config(format!(
                "loopback broadcast_address is {} bytes but addresses are {} bytes wide",
                address.width(),
                config.address_width
            )));
        }
        config.broadcast_address = Some(address);
    }

    if let Some(max_payload) = section.max_payload {
        if max_payload == 0 || max_payload > PAYLOAD_CAPACITY {
            return Err(AppError::Config(format!(
                "loopback max_payload must be 1 to {}, got {}",
                PAYLOAD_CAPACITY, max_payload
            )));
        }
        config.max_payload = max_payload;
    }

    Ok(config)
}
