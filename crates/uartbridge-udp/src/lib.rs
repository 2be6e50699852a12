//! uartbridge-udp - UDP datagram transport
//!
//! Carries one bridge message per UDP datagram over IPv4. A bridge address is
//! six bytes: the four IPv4 octets followed by the port in big-endian order,
//! so `ADDRESS 192 168 1 20 7 91` means `192.168.1.20:1883`.
//!
//! The socket is non-blocking; [`UdpTransport::poll`] drains whatever has
//! arrived since the last call and never waits.
//!
//! [`UdpTransport::poll`]: uartbridge_core::Transport::poll

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use thiserror::Error;
use uartbridge_core::error::{Error as CoreError, Result as CoreResult};
use uartbridge_core::message::{Address, ReceiveBuffer, PAYLOAD_CAPACITY};
use uartbridge_core::transport::Transport;

/// Address width: IPv4 octets plus a 16-bit port
pub const ADDRESS_WIDTH: usize = 6;

/// Datagrams read per poll before yielding back to the scheduler
const MAX_DATAGRAMS_PER_POLL: usize = 16;

/// UDP transport errors
#[derive(Debug, Error)]
pub enum UdpError {
    /// Socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested local address
        addr: SocketAddrV4,
        /// Underlying error
        source: std::io::Error,
    },

    /// Socket option or I/O failure
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Socket used before `initialize`
    #[error("Socket not open")]
    NotOpen,
}

/// Convert a socket address into a 6-byte bridge address
pub fn address_from_socket(addr: SocketAddrV4) -> Address {
    let mut bytes = [0u8; ADDRESS_WIDTH];
    bytes[..4].copy_from_slice(&addr.ip().octets());
    bytes[4..].copy_from_slice(&addr.port().to_be_bytes());
    Address::from_slice(&bytes).unwrap_or_else(|| Address::zeroed(ADDRESS_WIDTH))
}

/// Convert a 6-byte bridge address into a socket address
pub fn socket_from_address(address: &Address) -> Option<SocketAddrV4> {
    let bytes: [u8; ADDRESS_WIDTH] = address.as_bytes().try_into().ok()?;
    let ip = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from_be_bytes([bytes[4], bytes[5]]);
    Some(SocketAddrV4::new(ip, port))
}

/// UDP transport
pub struct UdpTransport {
    bind: SocketAddrV4,
    broadcast_port: u16,
    socket: Option<UdpSocket>,
    local: Option<SocketAddrV4>,
}

impl UdpTransport {
    /// Create a transport that will bind to `bind` on `initialize`
    ///
    /// Broadcasts go to `255.255.255.255:broadcast_port`.
    pub fn new(bind: SocketAddrV4, broadcast_port: u16) -> Self {
        Self {
            bind,
            broadcast_port,
            socket: None,
            local: None,
        }
    }

    /// Local socket address once initialized
    pub fn local_addr(&self) -> Option<SocketAddrV4> {
        self.local
    }

    fn open(&self) -> Result<(UdpSocket, SocketAddrV4), UdpError> {
        let socket = UdpSocket::bind(self.bind).map_err(|source| UdpError::Bind {
            addr: self.bind,
            source,
        })?;
        socket.set_nonblocking(true)?;
        socket.set_broadcast(true)?;

        let local = match socket.local_addr()? {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => self.bind,
        };
        Ok((socket, local))
    }

    fn socket(&self) -> Result<&UdpSocket, UdpError> {
        self.socket.as_ref().ok_or(UdpError::NotOpen)
    }
}

impl Transport for UdpTransport {
    fn initialize(&mut self) -> CoreResult<()> {
        // Release the previous socket so a restart can bind the same port
        if let Some(old) = self.local.take() {
            log::debug!("udp: closing {}", old);
        }
        self.socket = None;

        match self.open() {
            Ok((socket, local)) => {
                log::info!("udp: listening on {}", local);
                self.socket = Some(socket);
                self.local = Some(local);
                Ok(())
            }
            Err(e) => {
                log::error!("udp: {}", e);
                Err(CoreError::TransportInitFailed)
            }
        }
    }

    fn poll(&mut self, inbox: &mut ReceiveBuffer) -> CoreResult<()> {
        let socket = self.socket().map_err(|e| {
            log::error!("udp: {}", e);
            CoreError::TransportDisconnected
        })?;

        // Larger than any valid message so oversized datagrams are seen whole
        // and rejected by the receive buffer instead of being truncated
        let mut buf = [0u8; 2 * PAYLOAD_CAPACITY];
        for _ in 0..MAX_DATAGRAMS_PER_POLL {
            match socket.recv_from(&mut buf) {
                Ok((n, SocketAddr::V4(source))) => {
                    log::debug!("udp: {} bytes from {}", n, source);
                    inbox.offer(&address_from_socket(source), &buf[..n]);
                }
                Ok((_, source)) => {
                    log::debug!("udp: ignoring datagram from {}", source);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::error!("udp: receive failed: {}", e);
                    return Err(CoreError::TransportDisconnected);
                }
            }
        }
        Ok(())
    }

    fn send(&mut self, destination: &Address, payload: &[u8]) -> CoreResult<()> {
        let target = socket_from_address(destination).ok_or(CoreError::AddressWidthMismatch)?;
        if payload.len() > PAYLOAD_CAPACITY {
            return Err(CoreError::PayloadTooLarge);
        }
        let socket = self.socket().map_err(|_| CoreError::SendFailed)?;

        match socket.send_to(payload, target) {
            Ok(n) if n == payload.len() => {
                log::debug!("udp: {} bytes to {}", n, target);
                Ok(())
            }
            Ok(n) => {
                log::error!("udp: short send to {} ({} of {})", target, n, payload.len());
                Err(CoreError::SendFailed)
            }
            Err(e) => {
                log::error!("udp: send to {} failed: {}", target, e);
                Err(CoreError::SendFailed)
            }
        }
    }

    fn address_width(&self) -> usize {
        ADDRESS_WIDTH
    }

    fn own_address(&self) -> CoreResult<Option<Address>> {
        Ok(self
            .local
            .filter(|addr| !addr.ip().is_unspecified())
            .map(address_from_socket))
    }

    fn broadcast_address(&self) -> CoreResult<Option<Address>> {
        Ok(Some(address_from_socket(SocketAddrV4::new(
            Ipv4Addr::BROADCAST,
            self.broadcast_port,
        ))))
    }

    fn max_payload_size(&self) -> CoreResult<usize> {
        Ok(PAYLOAD_CAPACITY)
    }
}
